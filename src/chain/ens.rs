//! ENS name resolution against the mainnet registry.
//!
//! Forward resolution asks the registry for the name's resolver and then the
//! resolver for `addr(node)`. Reverse lookups read `name(node)` for
//! `<hex>.addr.reverse`, and only accept the result when it resolves back
//! to the same address.

use alloy::primitives::{Address, B256, keccak256};
use alloy::providers::DynProvider;

use super::contracts::{IEnsRegistry, IEnsResolver};

/// EIP-137 namehash of a dotted name.
#[must_use]
pub fn namehash(name: &str) -> B256 {
    name.rsplit('.')
        .filter(|label| !label.is_empty())
        .fold(B256::ZERO, |node, label| {
            let mut buf = [0_u8; 64];
            let (head, tail) = buf.split_at_mut(32);
            head.copy_from_slice(node.as_slice());
            tail.copy_from_slice(keccak256(label.as_bytes()).as_slice());
            keccak256(buf)
        })
}

/// Reverse-record node for `address`.
#[must_use]
pub fn reverse_node(address: &Address) -> B256 {
    let hex = address.to_string().to_ascii_lowercase();
    let bare = hex.trim_start_matches("0x");
    namehash(&format!("{bare}.addr.reverse"))
}

async fn resolver_for(
    provider: &DynProvider,
    registry: Address,
    node: B256,
) -> Result<Option<Address>, alloy::contract::Error> {
    let resolver = IEnsRegistry::new(registry, provider.clone())
        .resolver(node)
        .call()
        .await?;
    Ok((!resolver.is_zero()).then_some(resolver))
}

/// Resolves `name` to an address.
///
/// # Errors
///
/// Returns the underlying contract error when a call fails.
pub async fn resolve(
    provider: &DynProvider,
    registry: Address,
    name: &str,
) -> Result<Option<Address>, alloy::contract::Error> {
    let node = namehash(name);
    let Some(resolver) = resolver_for(provider, registry, node).await? else {
        return Ok(None);
    };
    let target = IEnsResolver::new(resolver, provider.clone())
        .addr(node)
        .call()
        .await?;
    Ok((!target.is_zero()).then_some(target))
}

/// Primary name of `address`, verified by forward resolution.
///
/// # Errors
///
/// Returns the underlying contract error when a call fails.
pub async fn lookup(
    provider: &DynProvider,
    registry: Address,
    address: Address,
) -> Result<Option<String>, alloy::contract::Error> {
    let node = reverse_node(&address);
    let Some(resolver) = resolver_for(provider, registry, node).await? else {
        return Ok(None);
    };
    let name = IEnsResolver::new(resolver, provider.clone())
        .name(node)
        .call()
        .await?;
    if name.is_empty() {
        return Ok(None);
    }
    let forward = resolve(provider, registry, &name).await?;
    Ok((forward == Some(address)).then_some(name))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;

    #[test]
    fn namehash_matches_eip137_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            b256!("0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae")
        );
        assert_eq!(
            namehash("foo.eth"),
            b256!("0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f")
        );
    }

    #[test]
    fn reverse_node_uses_lowercase_hex() {
        let who = address!("0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD");
        assert_eq!(
            reverse_node(&who),
            namehash("abcdefabcdefabcdefabcdefabcdefabcdefabcd.addr.reverse")
        );
    }
}
