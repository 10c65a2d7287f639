//! Target platform recorded in serialized file headers

use std::fmt;

/// Build target of a serialized file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    UnityPackage,
    Invalid,
    Osx,
    Windows,
    Web,
    WebStreamed,
    Ios,
    Ps3,
    Xbox360,
    Android,
    NaCl,
    CollabPreview,
    Wp8,
    Linux,
    WiiU,
    Unknown(i32),
}

impl Platform {
    pub fn from_id(id: i32) -> Self {
        match id {
            -2 => Platform::UnityPackage,
            0 => Platform::Invalid,
            4 => Platform::Osx,
            5 => Platform::Windows,
            6 => Platform::Web,
            7 => Platform::WebStreamed,
            9 => Platform::Ios,
            10 => Platform::Ps3,
            11 => Platform::Xbox360,
            13 => Platform::Android,
            16 => Platform::NaCl,
            19 => Platform::CollabPreview,
            21 => Platform::Wp8,
            25 => Platform::Linux,
            29 => Platform::WiiU,
            other => Platform::Unknown(other),
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Platform::UnityPackage => -2,
            Platform::Invalid => 0,
            Platform::Osx => 4,
            Platform::Windows => 5,
            Platform::Web => 6,
            Platform::WebStreamed => 7,
            Platform::Ios => 9,
            Platform::Ps3 => 10,
            Platform::Xbox360 => 11,
            Platform::Android => 13,
            Platform::NaCl => 16,
            Platform::CollabPreview => 19,
            Platform::Wp8 => 21,
            Platform::Linux => 25,
            Platform::WiiU => 29,
            Platform::Unknown(id) => id,
        }
    }

    /// Ids outside this range indicate the header was read in the wrong byte order
    pub fn is_plausible_id(id: i32) -> bool {
        (0..=255).contains(&id)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::UnityPackage => "UnityPackage",
            Platform::Invalid => "Invalid",
            Platform::Osx => "OSX",
            Platform::Windows => "Windows",
            Platform::Web => "Web",
            Platform::WebStreamed => "WebStreamed",
            Platform::Ios => "iOS",
            Platform::Ps3 => "PS3",
            Platform::Xbox360 => "Xbox 360",
            Platform::Android => "Android",
            Platform::NaCl => "NaCl",
            Platform::CollabPreview => "CollabPreview",
            Platform::Wp8 => "WP8",
            Platform::Linux => "Linux",
            Platform::WiiU => "Wii U",
            Platform::Unknown(id) => return write!(f, "Unknown({id})"),
        };
        f.write_str(name)
    }
}
