//! Row-level content hashes.
//!
//! Each row's selected values are joined with a separator and digested,
//! giving a stable key for de-duplicating report rows across loads.

use core::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::HashError;
use crate::table::Table;

/// Name of the column holding the digest.
pub(crate) const HASH_COLUMN: &str = "hash";

/// Default separator placed between values before hashing.
pub(crate) const DEFAULT_SEPARATOR: &str = "|||";

/// Rendering of an empty value in the hashed string.
const MISSING_VALUE: &str = "NaN";

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum HashAlgorithm {
    /// MD5, the digest existing report tables were keyed with.
    #[default]
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Hex digest of `input`.
    fn hex_digest(self, input: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(input)),
            Self::Sha1 => format!("{:x}", Sha1::digest(input)),
            Self::Sha224 => format!("{:x}", Sha224::digest(input)),
            Self::Sha256 => format!("{:x}", Sha256::digest(input)),
            Self::Sha384 => format!("{:x}", Sha384::digest(input)),
            Self::Sha512 => format!("{:x}", Sha512::digest(input)),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(HashError::UnsupportedAlgorithm(name.to_owned())),
        }
    }
}

/// Adds or refreshes the [`HASH_COLUMN`] of `table`.
///
/// # Errors
///
/// Returns [`HashError::MissingColumns`] listing every target column the
/// table lacks.
pub(crate) fn compute_row_hash(
    table: &mut Table,
    target_columns: &[String],
    separator: &str,
    algorithm: HashAlgorithm,
) -> Result<(), HashError> {
    let missing: Vec<String> = target_columns
        .iter()
        .filter(|column| table.column_index(column).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(HashError::MissingColumns(missing));
    }

    let digests: Vec<String> = table
        .records()
        .map(|record| {
            let joined = target_columns
                .iter()
                .map(|column| match record.get(column) {
                    Some(value) if !value.is_empty() => value,
                    _ => MISSING_VALUE,
                })
                .collect::<Vec<_>>()
                .join(separator);
            algorithm.hex_digest(joined.as_bytes())
        })
        .collect();

    table.set_column(HASH_COLUMN, digests);
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{DEFAULT_SEPARATOR, HASH_COLUMN, HashAlgorithm, compute_row_hash};
    use crate::error::HashError;
    use crate::table::Table;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn hashes(table: &Table) -> Vec<String> {
        table
            .records()
            .map(|record| record.get(HASH_COLUMN).unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn sha256_of_joined_values() {
        let mut table = Table::parse("name\tage", &["abc\t1"], 2).expect("should parse");
        compute_row_hash(
            &mut table,
            &columns(&["name"]),
            DEFAULT_SEPARATOR,
            HashAlgorithm::Sha256,
        )
        .expect("should hash");
        assert_eq!(
            hashes(&table),
            ["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"]
        );
    }

    #[test]
    fn default_algorithm_is_md5() {
        let mut table = Table::parse("name", &["abc"], 2).expect("should parse");
        compute_row_hash(
            &mut table,
            &columns(&["name"]),
            DEFAULT_SEPARATOR,
            HashAlgorithm::default(),
        )
        .expect("should hash");
        assert_eq!(hashes(&table), ["900150983cd24fb0d6963f7d28e17f72"]);
    }

    #[test]
    fn sha1_of_joined_values() {
        let mut table = Table::parse("name", &["abc"], 2).expect("should parse");
        compute_row_hash(&mut table, &columns(&["name"]), "|", HashAlgorithm::Sha1)
            .expect("should hash");
        assert_eq!(hashes(&table), ["a9993e364706816aba3e25717850c26c9cd0d89d"]);
    }

    #[test]
    fn identical_rows_hash_identically() {
        let mut table =
            Table::parse("a\tb\tc", &["1\t2\tx", "1\t2\ty", "2\t1\tx"], 2).expect("should parse");
        compute_row_hash(
            &mut table,
            &columns(&["a", "b"]),
            DEFAULT_SEPARATOR,
            HashAlgorithm::default(),
        )
        .expect("should hash");
        let digests = hashes(&table);
        assert_eq!(digests.first(), digests.get(1));
        assert_ne!(digests.first(), digests.get(2));
    }

    #[test]
    fn empty_values_hash_as_nan() {
        let mut with_empty = Table::parse("a\tb", &["1"], 2).expect("should parse");
        let mut with_nan = Table::parse("a\tb", &["1\tNaN"], 2).expect("should parse");
        let target = columns(&["a", "b"]);
        compute_row_hash(&mut with_empty, &target, "|", HashAlgorithm::Sha224).expect("hash");
        compute_row_hash(&mut with_nan, &target, "|", HashAlgorithm::Sha224).expect("hash");
        assert_eq!(hashes(&with_empty), hashes(&with_nan));
    }

    #[test]
    fn rehashing_replaces_existing_column() {
        let mut table = Table::parse("a", &["1"], 2).expect("should parse");
        let target = columns(&["a"]);
        compute_row_hash(&mut table, &target, "|", HashAlgorithm::Sha256).expect("hash");
        compute_row_hash(&mut table, &target, "|", HashAlgorithm::Sha512).expect("hash");
        assert_eq!(table.columns(), ["a", "hash"]);
        assert_eq!(hashes(&table).first().map(String::len), Some(128));
    }

    #[test]
    fn missing_columns_are_listed() {
        let mut table = Table::parse("a", &["1"], 2).expect("should parse");
        let err = compute_row_hash(
            &mut table,
            &columns(&["a", "x", "y"]),
            DEFAULT_SEPARATOR,
            HashAlgorithm::Sha256,
        )
        .expect_err("should fail");
        assert_eq!(err, HashError::MissingColumns(columns(&["x", "y"])));
    }

    #[test]
    fn algorithm_names_parse_loosely() {
        assert_eq!("SHA-384".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha384));
        assert_eq!("sha512".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha512));
        assert_eq!("MD5".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Md5));
        assert_eq!("sha-1".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha1));
        assert_eq!(
            "blake3".parse::<HashAlgorithm>(),
            Err(HashError::UnsupportedAlgorithm("blake3".to_owned()))
        );
    }
}
