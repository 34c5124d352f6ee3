//! Remote-control key codes.
//!
//! The TV accepts key presses as `NRC_<NAME>-ONOFF` strings inside an
//! `X_SendKey` command. `Key` is the fixed catalogue of known codes; raw
//! strings are still accepted by the client for codes missing here.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

macro_rules! keys {
    ($($variant:ident => $code:literal),+ $(,)?) => {
        /// Known remote-control keys.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $($variant),+
        }

        impl Key {
            /// Every known key, in catalogue order.
            pub const ALL: &'static [Key] = &[$(Key::$variant),+];

            /// Wire code sent in `X_KeyEvent`.
            pub const fn code(self) -> &'static str {
                match self {
                    $(Key::$variant => $code),+
                }
            }
        }
    };
}

keys! {
    ThirtySecondSkip => "NRC_30S_SKIP-ONOFF",
    Toggle3d => "NRC_3D-ONOFF",
    Apps => "NRC_APPS-ONOFF",
    Aspect => "NRC_ASPECT-ONOFF",
    Blue => "NRC_BLUE-ONOFF",
    Cancel => "NRC_CANCEL-ONOFF",
    ClosedCaptions => "NRC_CC-ONOFF",
    ChatMode => "NRC_CHAT_MODE-ONOFF",
    ChannelDown => "NRC_CH_DOWN-ONOFF",
    Input => "NRC_CHG_INPUT-ONOFF",
    Network => "NRC_CHG_NETWORK-ONOFF",
    ChannelUp => "NRC_CH_UP-ONOFF",
    Num0 => "NRC_D0-ONOFF",
    Num1 => "NRC_D1-ONOFF",
    Num2 => "NRC_D2-ONOFF",
    Num3 => "NRC_D3-ONOFF",
    Num4 => "NRC_D4-ONOFF",
    Num5 => "NRC_D5-ONOFF",
    Num6 => "NRC_D6-ONOFF",
    Num7 => "NRC_D7-ONOFF",
    Num8 => "NRC_D8-ONOFF",
    Num9 => "NRC_D9-ONOFF",
    DigaControl => "NRC_DIGA_CTL-ONOFF",
    Display => "NRC_DISP_MODE-ONOFF",
    Down => "NRC_DOWN-ONOFF",
    Enter => "NRC_ENTER-ONOFF",
    Epg => "NRC_EPG-ONOFF",
    EzSync => "NRC_EZ_SYNC-ONOFF",
    Favorite => "NRC_FAVORITE-ONOFF",
    FastForward => "NRC_FF-ONOFF",
    Game => "NRC_GAME-ONOFF",
    Green => "NRC_GREEN-ONOFF",
    Guide => "NRC_GUIDE-ONOFF",
    Hold => "NRC_HOLD-ONOFF",
    Home => "NRC_HOME-ONOFF",
    Index => "NRC_INDEX-ONOFF",
    Info => "NRC_INFO-ONOFF",
    Connect => "NRC_INTERNET-ONOFF",
    Left => "NRC_LEFT-ONOFF",
    Menu => "NRC_MENU-ONOFF",
    Mpx => "NRC_MPX-ONOFF",
    Mute => "NRC_MUTE-ONOFF",
    NetBs => "NRC_NET_BS-ONOFF",
    NetCs => "NRC_NET_CS-ONOFF",
    NetTd => "NRC_NET_TD-ONOFF",
    OffTimer => "NRC_OFFTIMER-ONOFF",
    Pause => "NRC_PAUSE-ONOFF",
    Pictai => "NRC_PICTAI-ONOFF",
    Play => "NRC_PLAY-ONOFF",
    PNr => "NRC_P_NR-ONOFF",
    Power => "NRC_POWER-ONOFF",
    Program => "NRC_PROG-ONOFF",
    Record => "NRC_REC-ONOFF",
    Red => "NRC_RED-ONOFF",
    Return => "NRC_RETURN-ONOFF",
    Rewind => "NRC_REW-ONOFF",
    Right => "NRC_RIGHT-ONOFF",
    RScreen => "NRC_R_SCREEN-ONOFF",
    LastView => "NRC_R_TUNE-ONOFF",
    Sap => "NRC_SAP-ONOFF",
    ToggleSdCard => "NRC_SD_CARD-ONOFF",
    SkipNext => "NRC_SKIP_NEXT-ONOFF",
    SkipPrev => "NRC_SKIP_PREV-ONOFF",
    Split => "NRC_SPLIT-ONOFF",
    Stop => "NRC_STOP-ONOFF",
    Subtitles => "NRC_STTL-ONOFF",
    Option => "NRC_SUBMENU-ONOFF",
    Surround => "NRC_SURROUND-ONOFF",
    Swap => "NRC_SWAP-ONOFF",
    Text => "NRC_TEXT-ONOFF",
    Tv => "NRC_TV-ONOFF",
    Up => "NRC_UP-ONOFF",
    Link => "NRC_VIERA_LINK-ONOFF",
    VolumeDown => "NRC_VOLDOWN-ONOFF",
    VolumeUp => "NRC_VOLUP-ONOFF",
    Vtools => "NRC_VTOOLS-ONOFF",
    Yellow => "NRC_YELLOW-ONOFF",
}

impl Key {
    /// Short name without the `NRC_` prefix and `-ONOFF` suffix, e.g. `EPG`.
    pub fn short_name(self) -> &'static str {
        let code = self.code();
        let code = code.strip_prefix("NRC_").unwrap_or(code);
        code.strip_suffix("-ONOFF").unwrap_or(code)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Key {
    type Err = Error;

    /// Accepts the full wire code (`NRC_EPG-ONOFF`) or the short name (`epg`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Key::ALL
            .iter()
            .copied()
            .find(|key| {
                key.code().eq_ignore_ascii_case(wanted)
                    || key.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::InvalidArgument(format!("unknown key: {}", wanted)))
    }
}
