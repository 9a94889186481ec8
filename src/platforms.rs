use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform support profile built from the three platform flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformProfile {
    WindowsMacLinux,
    WindowsMac,
    WindowsLinux,
    WindowsOnly,
    #[default]
    Other,
}

impl PlatformProfile {
    pub fn classify(windows: bool, mac: bool, linux: bool) -> Self {
        match (windows, mac, linux) {
            (true, true, true) => PlatformProfile::WindowsMacLinux,
            (true, true, false) => PlatformProfile::WindowsMac,
            (true, false, true) => PlatformProfile::WindowsLinux,
            (true, false, false) => PlatformProfile::WindowsOnly,
            (false, _, _) => PlatformProfile::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformProfile::WindowsMacLinux => "windows_mac_linux",
            PlatformProfile::WindowsMac => "windows_mac",
            PlatformProfile::WindowsLinux => "windows_linux",
            PlatformProfile::WindowsOnly => "windows_only",
            PlatformProfile::Other => "other",
        }
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_combination() {
        use PlatformProfile::*;
        let cases = [
            ((true, true, true), WindowsMacLinux),
            ((true, true, false), WindowsMac),
            ((true, false, true), WindowsLinux),
            ((true, false, false), WindowsOnly),
            ((false, true, true), Other),
            ((false, true, false), Other),
            ((false, false, true), Other),
            ((false, false, false), Other),
        ];
        for ((w, m, l), expected) in cases {
            assert_eq!(PlatformProfile::classify(w, m, l), expected, "{w} {m} {l}");
        }
    }
}
