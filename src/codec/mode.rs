//! Selection between the zero-copy and portable codec paths.
//!
//! The zero-copy path hands the native byte representation of `u16` and `u64`
//! storage straight to readers and writers, which is only equivalent to the
//! little-endian wire format on little-endian hosts where element arrays carry
//! no padding. [`Capabilities`] describes that gate and [`Codec`] records the
//! decision once so callers can inspect it.

use std::{env, fmt::Display, str::FromStr, sync::OnceLock};

use thiserror::Error;
use tracing::{debug, warn};

use crate::container::run::EncodedInterval;

/// Environment variable consulted by [`Codec::from_env`].
pub const MODE_ENV: &str = "ROARING_CODEC_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Native byte order is little-endian.
    pub little_endian: bool,
    /// Element arrays are laid out without padding between elements.
    pub packed: bool,
}

impl Capabilities {
    pub const fn host() -> Self {
        Self {
            little_endian: cfg!(target_endian = "little"),
            packed: size_of::<[u16; 2]>() == 4
                && size_of::<[u64; 2]>() == 16
                && size_of::<[EncodedInterval; 2]>() == 8,
        }
    }

    #[inline]
    pub const fn supports_zero_copy(&self) -> bool {
        self.little_endian && self.packed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecMode {
    /// Alias container storage directly as wire bytes.
    ZeroCopy,
    /// Copy value by value with explicit little-endian composition.
    Portable,
}

impl Display for CodecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecMode::ZeroCopy => f.write_str("zero-copy"),
            CodecMode::Portable => f.write_str("portable"),
        }
    }
}

impl FromStr for CodecMode {
    type Err = ConfigErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero-copy" | "zerocopy" | "zero_copy" => Ok(CodecMode::ZeroCopy),
            "portable" => Ok(CodecMode::Portable),
            _ => Err(ConfigErr::UnknownMode(s.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigErr {
    #[error("unknown codec mode {0:?}, expected one of: auto, zero-copy, portable")]
    UnknownMode(String),

    #[error("codec mode {0} is not supported on this host")]
    Unsupported(CodecMode),
}

/// A resolved codec configuration.
///
/// A `Codec` in [`CodecMode::ZeroCopy`] can only be constructed on a host
/// whose [`Capabilities`] pass the zero-copy gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    mode: CodecMode,
}

impl Codec {
    /// The copying codec. Available on every host.
    pub const fn portable() -> Self {
        Self { mode: CodecMode::Portable }
    }

    /// The aliasing codec, if this host supports it.
    pub fn zero_copy() -> Option<Self> {
        Capabilities::host()
            .supports_zero_copy()
            .then_some(Self { mode: CodecMode::ZeroCopy })
    }

    /// Pick the fastest codec allowed by `caps`. Zero-copy additionally
    /// requires the host itself to pass the gate.
    pub fn for_capabilities(caps: Capabilities) -> Self {
        if caps.supports_zero_copy() {
            Self::zero_copy().unwrap_or(Self::portable())
        } else {
            Self::portable()
        }
    }

    #[inline]
    pub fn detect() -> Self {
        Self::for_capabilities(Capabilities::host())
    }

    /// Resolve a codec from a textual setting: `auto` (or empty), `zero-copy`,
    /// or `portable`.
    pub fn from_setting(setting: &str) -> Result<Self, ConfigErr> {
        let setting = setting.trim();
        if setting.is_empty() || setting.eq_ignore_ascii_case("auto") {
            return Ok(Self::detect());
        }
        match setting.parse()? {
            CodecMode::Portable => Ok(Self::portable()),
            CodecMode::ZeroCopy => {
                Self::zero_copy().ok_or(ConfigErr::Unsupported(CodecMode::ZeroCopy))
            }
        }
    }

    /// Resolve a codec from [`MODE_ENV`], detecting when it is unset.
    pub fn from_env() -> Result<Self, ConfigErr> {
        match env::var(MODE_ENV) {
            Ok(setting) => Self::from_setting(&setting),
            Err(env::VarError::NotPresent) => Ok(Self::detect()),
            Err(env::VarError::NotUnicode(raw)) => {
                Err(ConfigErr::UnknownMode(raw.to_string_lossy().into_owned()))
            }
        }
    }

    /// The process-wide codec, resolved from the environment on first use.
    pub fn global() -> &'static Codec {
        static GLOBAL: OnceLock<Codec> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let codec = Self::from_env().unwrap_or_else(|err| {
                warn!(%err, env = MODE_ENV, "ignoring codec mode setting, detecting instead");
                Self::detect()
            });
            debug!(mode = %codec.mode, "resolved codec mode");
            codec
        })
    }

    #[inline]
    pub fn mode(&self) -> CodecMode {
        self.mode
    }

    #[inline]
    pub fn is_zero_copy(&self) -> bool {
        self.mode == CodecMode::ZeroCopy
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::detect()
    }
}
