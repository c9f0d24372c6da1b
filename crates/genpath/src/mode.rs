//! Stream and proxy modes.
//!
//! [`OpenMode`] parses conventional file-open mode strings (`"r"`, `"wb"`,
//! `"a+"`, ...). [`ProxyMode`] selects how a proxy session stages a file.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::{PathError, PathResult};

/// Primary access kind of a mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `r`: read an existing file.
    Read,
    /// `w`: create or truncate, then write.
    Write,
    /// `a`: create if needed, write at the end.
    Append,
    /// `x`: create, failing if the file exists.
    CreateNew,
}

/// A parsed file-open mode.
///
/// Exactly one of `r`, `w`, `a`, `x` must appear, optionally followed by
/// `+` (update) and at most one of `b` (binary) or `t` (text).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    access: Access,
    update: bool,
    binary: bool,
}

impl OpenMode {
    /// `"r"`
    pub const READ: OpenMode = OpenMode {
        access: Access::Read,
        update: false,
        binary: false,
    };

    /// `"rb"`
    pub const READ_BINARY: OpenMode = OpenMode {
        access: Access::Read,
        update: false,
        binary: true,
    };

    /// `"wb"`
    pub const WRITE_BINARY: OpenMode = OpenMode {
        access: Access::Write,
        update: false,
        binary: true,
    };

    /// Parse a mode string.
    pub fn parse(mode: &str) -> PathResult<Self> {
        let mut access = None;
        let mut update = false;
        let mut binary = None;

        for c in mode.chars() {
            match c {
                'r' | 'w' | 'a' | 'x' => {
                    if access.is_some() {
                        return Err(PathError::invalid_mode(format!(
                            "{mode:?}: more than one of r/w/a/x"
                        )));
                    }
                    access = Some(match c {
                        'r' => Access::Read,
                        'w' => Access::Write,
                        'a' => Access::Append,
                        _ => Access::CreateNew,
                    });
                }
                '+' if !update => update = true,
                'b' | 't' if binary.is_none() => binary = Some(c == 'b'),
                _ => {
                    return Err(PathError::invalid_mode(format!(
                        "{mode:?}: unexpected {c:?}"
                    )));
                }
            }
        }

        let access = access
            .ok_or_else(|| PathError::invalid_mode(format!("{mode:?}: needs one of r/w/a/x")))?;

        Ok(Self {
            access,
            update,
            binary: binary.unwrap_or(false),
        })
    }

    /// Primary access kind.
    pub fn access(&self) -> Access {
        self.access
    }

    /// True if `+` was given.
    pub fn is_update(&self) -> bool {
        self.update
    }

    /// True if `b` was given.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// True if the stream can be read from.
    pub fn readable(&self) -> bool {
        self.access == Access::Read || self.update
    }

    /// True if the stream can be written to.
    pub fn writable(&self) -> bool {
        self.access != Access::Read || self.update
    }

    /// True if writing in this mode keeps existing content (`a`, `r+`).
    pub fn preserves_content(&self) -> bool {
        match self.access {
            Access::Append => true,
            Access::Read => self.update,
            Access::Write | Access::CreateNew => false,
        }
    }

    /// Build matching tokio open options.
    pub fn open_options(&self) -> tokio::fs::OpenOptions {
        let mut opts = tokio::fs::OpenOptions::new();
        opts.read(self.readable());
        match self.access {
            Access::Read => {
                opts.write(self.update);
            }
            Access::Write => {
                opts.write(true).create(true).truncate(true);
            }
            Access::Append => {
                opts.append(true).create(true);
            }
            Access::CreateNew => {
                opts.write(true).create_new(true);
            }
        }
        opts
    }

    pub(crate) fn require_readable(&self) -> PathResult<()> {
        if self.readable() {
            Ok(())
        } else {
            Err(PathError::invalid_mode(format!("{self} does not permit reading")))
        }
    }

    pub(crate) fn require_writable(&self) -> PathResult<()> {
        if self.writable() {
            Ok(())
        } else {
            Err(PathError::invalid_mode(format!("{self} does not permit writing")))
        }
    }
}

impl FromStr for OpenMode {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self.access {
            Access::Read => 'r',
            Access::Write => 'w',
            Access::Append => 'a',
            Access::CreateNew => 'x',
        };
        write!(f, "{c}")?;
        if self.update {
            write!(f, "+")?;
        }
        if self.binary {
            write!(f, "b")?;
        }
        Ok(())
    }
}

/// How a proxy session stages the generalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ProxyMode {
    /// Pre-populate; never write back.
    #[strum(serialize = "r")]
    Read,
    /// Start empty; write back on commit.
    #[strum(serialize = "w")]
    Write,
    /// Pre-populate; write back on commit.
    #[strum(serialize = "rw")]
    ReadWrite,
}

impl ProxyMode {
    /// True if the staged file is populated from the target on entry.
    pub fn reads(&self) -> bool {
        matches!(self, ProxyMode::Read | ProxyMode::ReadWrite)
    }

    /// True if the staged file is copied back to the target on commit.
    pub fn writes(&self) -> bool {
        matches!(self, ProxyMode::Write | ProxyMode::ReadWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_modes() {
        let r = OpenMode::parse("r").unwrap();
        assert!(r.readable());
        assert!(!r.writable());
        assert!(!r.is_binary());

        let wb = OpenMode::parse("wb").unwrap();
        assert_eq!(wb.access(), Access::Write);
        assert!(wb.is_binary());
        assert!(!wb.readable());

        let a_plus = OpenMode::parse("a+").unwrap();
        assert!(a_plus.readable());
        assert!(a_plus.writable());
        assert!(a_plus.preserves_content());
    }

    #[test]
    fn test_order_independent() {
        assert_eq!(OpenMode::parse("br").unwrap(), OpenMode::READ_BINARY);
        assert_eq!(OpenMode::parse("+rb").unwrap(), OpenMode::parse("rb+").unwrap());
    }

    #[test]
    fn test_invalid_modes() {
        for bad in ["", "rw", "b", "rr", "r++", "rbt", "q", "w+x"] {
            assert!(
                matches!(OpenMode::parse(bad), Err(PathError::InvalidMode(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_preserves_content() {
        assert!(OpenMode::parse("r+").unwrap().preserves_content());
        assert!(!OpenMode::parse("w+").unwrap().preserves_content());
        assert!(!OpenMode::parse("x").unwrap().preserves_content());
        assert!(!OpenMode::parse("r").unwrap().preserves_content());
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(OpenMode::parse("rb+").unwrap().to_string(), "r+b");
        assert_eq!(OpenMode::parse("a").unwrap().to_string(), "a");
    }

    #[test]
    fn test_proxy_mode_strings() {
        assert_eq!(ProxyMode::ReadWrite.to_string(), "rw");
        assert_eq!("w".parse::<ProxyMode>().unwrap(), ProxyMode::Write);
        assert!("x".parse::<ProxyMode>().is_err());
        assert!(ProxyMode::Read.reads() && !ProxyMode::Read.writes());
        assert!(!ProxyMode::Write.reads() && ProxyMode::Write.writes());
    }
}
