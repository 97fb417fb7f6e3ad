//! Build metadata captured by `build.rs`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

const UNKNOWN: &str = "unknown";

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("CAREPORTAL_BUILD_HASH").unwrap_or(UNKNOWN),
        git_status: option_env!("CAREPORTAL_BUILD_STATUS").unwrap_or(UNKNOWN),
        timestamp: option_env!("CAREPORTAL_BUILD_TIMESTAMP").unwrap_or(UNKNOWN),
        target: option_env!("CAREPORTAL_BUILD_TARGET").unwrap_or(UNKNOWN),
        profile: option_env!("CAREPORTAL_BUILD_PROFILE").unwrap_or(UNKNOWN),
        rustc: option_env!("CAREPORTAL_BUILD_RUSTC").unwrap_or(UNKNOWN),
    }
}

impl fmt::Display for BuildMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "careportal {}", self.version)?;
        writeln!(f, "commit:  {} ({})", self.git_hash, self.git_status)?;
        writeln!(f, "built:   {} [{}]", self.timestamp, self.profile)?;
        writeln!(f, "target:  {}", self.target)?;
        write!(f, "rustc:   {}", self.rustc)
    }
}
