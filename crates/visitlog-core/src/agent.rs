//! Best-effort browser/platform classification from a raw user-agent string.
//!
//! Matching is plain case-sensitive substring search. Order matters: many
//! user agents carry tokens of other browsers (every Chrome UA also says
//! "Safari", Edge says "Chrome", Android says "Linux"), so the first rule that
//! matches wins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    SamsungBrowser,
    Opera,
    InternetExplorer,
    Edge,
    Chrome,
    Safari,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Mac,
    Linux,
    Android,
    Ios,
    Unknown,
}

const BROWSER_RULES: &[(&[&str], Browser)] = &[
    (&["Firefox"], Browser::Firefox),
    (&["SamsungBrowser"], Browser::SamsungBrowser),
    (&["Opera", "OPR"], Browser::Opera),
    (&["Trident"], Browser::InternetExplorer),
    (&["Edge"], Browser::Edge),
    (&["Chrome"], Browser::Chrome),
    (&["Safari"], Browser::Safari),
];

const PLATFORM_RULES: &[(&[&str], Platform)] = &[
    (&["Windows"], Platform::Windows),
    (&["Mac"], Platform::Mac),
    (&["Linux"], Platform::Linux),
    (&["Android"], Platform::Android),
    (&["iOS", "iPhone", "iPad"], Platform::Ios),
];

impl Browser {
    pub fn detect(user_agent: &str) -> Self {
        first_match(user_agent, BROWSER_RULES).unwrap_or(Self::Unknown)
    }

    /// Label stored in the visit record.
    pub fn label(self) -> &'static str {
        match self {
            Self::Firefox => "Firefox",
            Self::SamsungBrowser => "Samsung Browser",
            Self::Opera => "Opera",
            Self::InternetExplorer => "Internet Explorer",
            Self::Edge => "Edge",
            Self::Chrome => "Chrome",
            Self::Safari => "Safari",
            Self::Unknown => crate::visit::UNKNOWN,
        }
    }
}

impl Platform {
    pub fn detect(user_agent: &str) -> Self {
        first_match(user_agent, PLATFORM_RULES).unwrap_or(Self::Unknown)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Mac => "Mac",
            Self::Linux => "Linux",
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::Unknown => crate::visit::UNKNOWN,
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Browser and platform detected from one user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentInfo {
    pub browser: Browser,
    pub platform: Platform,
}

pub fn detect(user_agent: &str) -> AgentInfo {
    AgentInfo {
        browser: Browser::detect(user_agent),
        platform: Platform::detect(user_agent),
    }
}

/// User agent describing the host this binary runs on.
///
/// Uses the same OS tokens browsers emit so [`Platform::detect`] classifies
/// it; the browser part stays unrecognised.
pub fn host_user_agent() -> String {
    let os_token = match std::env::consts::OS {
        "windows" => "Windows NT 10.0; Win64; x64",
        "macos" => "Macintosh; Intel Mac OS X 10_15_7",
        "linux" => "X11; Linux x86_64",
        "android" => "Android",
        "ios" => "iPhone; CPU iPhone OS like Mac OS X",
        other => other,
    };
    format!("visitlog/{} ({os_token})", env!("CARGO_PKG_VERSION"))
}

fn first_match<T: Copy>(user_agent: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|token| user_agent.contains(token)))
        .map(|(_, value)| *value)
}
