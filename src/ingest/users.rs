//! Lazy user-row derivation.
//!
//! Users are not announced by any event; an address becomes a user the
//! first time it appears as a token creator or trader. Rows are
//! first-seen-wins (`ON CONFLICT DO NOTHING`) and never updated by the
//! indexer afterwards.

use sqlx::PgConnection;

use crate::error::WorkerError;

/// IPFS gateway serving the default avatar set.
const AVATAR_BASE: &str = "https://leofi-pump.myfilebase.com/ipfs/";

/// Default avatar images, assigned deterministically by address.
const AVATARS: [&str; 6] = [
    "QmS6Db1KFVjgdQNMvn32MCPNhdzNxEN7eyW9A2HscS6N2c",
    "Qmc6qfqQm5C2nT8UpVi2fjEzekcfm87aakvhtMRfw7XRTC",
    "QmVcu16LTURQY4DrAi5EfwpL4DA7Lv2xNjt4yH7hEZir5b",
    "QmNLhmywEN57CifjKxr31ELTHTStDCHAVgnVVTKBtAHqog",
    "QmQVR89NXTXjGNxrJF2GA1oU1rbTLdLPdp1MMuXvCRJVBm",
    "QmQHF5V3vDUgsXwMeQrmX6yNqDzBE2JRFGQn9Csbwm7DWi",
];

/// A user row derived from an on-chain address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Account address.
    pub addr: String,
    /// Default display name (address prefix).
    pub name: String,
    /// Default avatar URI.
    pub img: String,
}

impl NewUser {
    /// Derives the default user row for an address.
    #[must_use]
    pub fn from_addr(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            name: addr.chars().take(8).collect(),
            img: avatar_for(addr),
        }
    }
}

/// Picks an avatar for an address. The choice is a stable function of the
/// address so batch replays derive identical rows.
fn avatar_for(addr: &str) -> String {
    let sum = addr.bytes().fold(0_usize, |acc, b| acc.wrapping_add(b as usize));
    let cid = AVATARS[sum % AVATARS.len()];
    format!("{AVATAR_BASE}{cid}")
}

/// Derives deduplicated user rows from a batch of addresses, keeping the
/// first occurrence of each address.
#[must_use]
pub fn derive_users<'a>(addrs: impl IntoIterator<Item = &'a str>) -> Vec<NewUser> {
    let mut seen = std::collections::HashSet::new();
    addrs
        .into_iter()
        .filter(|addr| seen.insert(addr.to_string()))
        .map(NewUser::from_addr)
        .collect()
}

/// Inserts user rows first-seen-wins and returns how many were actually
/// new, for the running user count.
///
/// # Errors
///
/// Returns [`WorkerError::Database`] on query failure.
pub async fn insert_users(
    conn: &mut PgConnection,
    users: &[NewUser],
) -> Result<u64, WorkerError> {
    if users.is_empty() {
        return Ok(0);
    }

    let addrs: Vec<String> = users.iter().map(|u| u.addr.clone()).collect();
    let names: Vec<String> = users.iter().map(|u| u.name.clone()).collect();
    let imgs: Vec<String> = users.iter().map(|u| u.img.clone()).collect();

    let result = sqlx::query(
        "INSERT INTO users (addr, name, img) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[]) \
         ON CONFLICT (addr) DO NOTHING",
    )
    .bind(&addrs)
    .bind(&names)
    .bind(&imgs)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_users_dedups_first_seen() {
        let users = derive_users(["0xa11ce", "0xb0b", "0xa11ce"]);
        assert_eq!(users.len(), 2);
        assert_eq!(users.first().map(|u| u.addr.as_str()), Some("0xa11ce"));
        assert_eq!(users.get(1).map(|u| u.addr.as_str()), Some("0xb0b"));
    }

    #[test]
    fn test_name_is_address_prefix() {
        let user = NewUser::from_addr("0x4e5e85fd647c7e19");
        assert_eq!(user.name, "0x4e5e85");
        assert_eq!(user.name.len(), 8);
    }

    #[test]
    fn test_short_address_name() {
        let user = NewUser::from_addr("0xb0b");
        assert_eq!(user.name, "0xb0b");
    }

    #[test]
    fn test_avatar_is_deterministic_and_in_set() {
        let a = avatar_for("0xa11ce");
        let b = avatar_for("0xa11ce");
        assert_eq!(a, b);
        assert!(a.starts_with(AVATAR_BASE));
        assert!(AVATARS.iter().any(|cid| a.ends_with(cid)));
    }

    #[test]
    fn test_avatar_varies_by_address() {
        let distinct: std::collections::HashSet<String> = ["0xa", "0xb", "0xc", "0xd"]
            .iter()
            .map(|addr| avatar_for(addr))
            .collect();
        assert!(distinct.len() > 1);
    }
}
