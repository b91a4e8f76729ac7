//! Filesystem families and their naming rules.

use serde::{Deserialize, Serialize};

/// Filesystem family hosting a local path.
///
/// Governs case sensitivity and which single-byte characters must be escaped
/// before a name can be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSystemType {
    Ntfs,
    Exfat,
    Fat32,
    Ext,
    Hfs,
    Apfs,
    Fuse,
    Sdcardfs,
    F2fs,
    Xfs,
    #[default]
    Unknown,
}

/// Characters rejected by FAT-style filesystems in addition to control bytes.
const FAT_RESERVED: &[u8] = b"\\/:?\"<>|*";

impl FileSystemType {
    /// All known types, `Unknown` last.
    pub const ALL: [FileSystemType; 11] = [
        Self::Ntfs,
        Self::Exfat,
        Self::Fat32,
        Self::Ext,
        Self::Hfs,
        Self::Apfs,
        Self::Fuse,
        Self::Sdcardfs,
        Self::F2fs,
        Self::Xfs,
        Self::Unknown,
    ];

    /// Diagnostic label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ntfs => "NTFS",
            Self::Exfat => "EXFAT",
            Self::Fat32 => "FAT32",
            Self::Ext => "EXT",
            Self::Hfs => "HFS",
            Self::Apfs => "APFS",
            Self::Fuse => "FUSE",
            Self::Sdcardfs => "SDCARDFS",
            Self::F2fs => "F2FS",
            Self::Xfs => "XFS",
            Self::Unknown => "UNKNOWN FS",
        }
    }

    /// Whether names on this filesystem compare case-insensitively.
    ///
    /// An unknown filesystem is assumed to be case-insensitive.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Self::Exfat | Self::Fat32 | Self::Ntfs | Self::Unknown)
    }

    /// Whether `byte` may appear unescaped in a single-byte position of a
    /// local name.
    ///
    /// NUL and `%` are never compatible: `%` must always be escaped so local
    /// names can be unescaped unambiguously.
    pub fn is_compatible(&self, byte: u8) -> bool {
        if byte == 0 || byte == b'%' {
            return false;
        }

        match self {
            Self::Apfs | Self::Hfs => byte != b':' && byte != b'/',
            Self::Ext | Self::F2fs | Self::Xfs => byte != b'/',
            Self::Exfat
            | Self::Fat32
            | Self::Fuse
            | Self::Ntfs
            | Self::Sdcardfs
            | Self::Unknown => !(is_control(byte) || FAT_RESERVED.contains(&byte)),
        }
    }
}

impl std::fmt::Display for FileSystemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// ASCII control byte: below 0x20, or DEL.
pub fn is_control(byte: u8) -> bool {
    byte < 0x20 || byte == 0x7f
}
