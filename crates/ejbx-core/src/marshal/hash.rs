//! Method hashing and per-interface hash tables
//!
//! A method travels on the wire as a 64-bit hash of its canonical descriptor.
//! Both peers compute the same hash from the same interface, so the receiving
//! side can resolve it back through a [`MethodMap`].

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{InvocationError, InvocationResult};
use crate::invocation::{InterfaceDescriptor, InterfaceId, MethodDescriptor};

/// Compute the wire hash of `method`.
///
/// The canonical descriptor `name(paramCodes)returnCode` is framed as a u16
/// big-endian length followed by its UTF-8 bytes, digested with SHA-256, and
/// the first eight digest bytes are folded little-endian into an `i64`.
///
/// A descriptor longer than 65 535 bytes has no length prefix and is
/// rejected with [`InvocationError::InvalidInvocation`].
pub fn method_hash(method: &MethodDescriptor) -> InvocationResult<i64> {
    descriptor_hash(&method.descriptor())
}

fn descriptor_hash(descriptor: &str) -> InvocationResult<i64> {
    let bytes = descriptor.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| {
        InvocationError::invalid_invocation(format!(
            "method descriptor of {} bytes exceeds the u16 length prefix",
            bytes.len()
        ))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
    let digest = hasher.finalize();

    Ok(digest
        .iter()
        .take(8)
        .enumerate()
        .fold(0i64, |hash, (j, b)| hash.wrapping_add(i64::from(*b) << (8 * j))))
}

/// Cache of method hashes, one table per interface version.
///
/// Tables are computed once per [`InterfaceId`] and kept until
/// [`remove_hashes`](Self::remove_hashes) evicts them, typically when the
/// interface is undeployed. Reads never block each other.
#[derive(Debug, Default)]
pub struct MethodHashCache {
    tables: DashMap<InterfaceId, HashMap<String, i64>>,
}

impl MethodHashCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash of `method`, computed on first use and cached under its
    /// declaring interface
    pub fn hash_of(&self, method: &MethodDescriptor) -> InvocationResult<i64> {
        let descriptor = method.descriptor();
        if let Some(table) = self.tables.get(&method.declaring)
            && let Some(hash) = table.get(&descriptor)
        {
            return Ok(*hash);
        }

        let hash = descriptor_hash(&descriptor)?;
        self.tables
            .entry(method.declaring.clone())
            .or_default()
            .insert(descriptor, hash);
        Ok(hash)
    }

    /// Compute and cache the hashes of every method of `interface`, returning
    /// the receiving-side lookup table.
    ///
    /// Nothing is cached when any method of `interface` cannot be hashed.
    pub fn register_interface(
        &self,
        interface: &InterfaceDescriptor,
    ) -> InvocationResult<MethodMap> {
        let mut map = MethodMap::new();
        let mut table = HashMap::with_capacity(interface.methods().len());
        for method in interface.methods() {
            let descriptor = method.descriptor();
            let hash = descriptor_hash(&descriptor)?;
            if let Some(previous) = map.get(hash)
                && previous.descriptor() != descriptor
            {
                tracing::warn!(
                    interface = %interface.id(),
                    first = %previous,
                    second = %method,
                    "Method hash collision"
                );
            }
            table.insert(descriptor, hash);
            map.insert(hash, Arc::clone(method));
        }
        self.tables.insert(interface.id().clone(), table);
        tracing::debug!(interface = %interface.id(), methods = map.len(), "Registered method hashes");
        Ok(map)
    }

    /// Evict the table of `interface`; returns whether one was cached
    pub fn remove_hashes(&self, interface: &InterfaceId) -> bool {
        self.tables.remove(interface).is_some()
    }

    /// True when a table for `interface` is cached
    #[must_use]
    pub fn contains(&self, interface: &InterfaceId) -> bool {
        self.tables.contains_key(interface)
    }

    /// Number of cached interface tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Receiving-side table from method hash to method.
#[derive(Debug, Clone, Default)]
pub struct MethodMap {
    methods: HashMap<i64, Arc<MethodDescriptor>>,
}

impl MethodMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Map containing every method of `interface`
    pub fn for_interface(interface: &InterfaceDescriptor) -> InvocationResult<Self> {
        let mut map = Self::new();
        for method in interface.methods() {
            map.add(Arc::clone(method))?;
        }
        Ok(map)
    }

    /// Add `method` under `hash`
    pub fn insert(&mut self, hash: i64, method: Arc<MethodDescriptor>) {
        self.methods.insert(hash, method);
    }

    /// Add `method` under its computed hash
    pub fn add(&mut self, method: Arc<MethodDescriptor>) -> InvocationResult<i64> {
        let hash = method_hash(&method)?;
        self.methods.insert(hash, method);
        Ok(hash)
    }

    /// Method registered under `hash`
    #[must_use]
    pub fn get(&self, hash: i64) -> Option<&Arc<MethodDescriptor>> {
        self.methods.get(&hash)
    }

    /// Resolve `hash`, failing with [`InvocationError::MethodNotFound`] when
    /// the peer's interface does not match ours
    pub fn resolve(&self, hash: i64) -> InvocationResult<Arc<MethodDescriptor>> {
        self.methods
            .get(&hash)
            .cloned()
            .ok_or(InvocationError::MethodNotFound { hash })
    }

    /// Number of methods
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True when empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::TypeDescriptor;
    use std::collections::HashSet;

    fn overloaded_interface() -> InterfaceDescriptor {
        let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Calculator", 3));
        let types = [
            TypeDescriptor::Int,
            TypeDescriptor::Long,
            TypeDescriptor::Double,
            TypeDescriptor::class("java.lang.String"),
            TypeDescriptor::array(TypeDescriptor::Byte),
        ];
        for a in &types {
            for b in &types {
                iface.declare("compute", vec![a.clone(), b.clone()], TypeDescriptor::Void);
            }
        }
        iface.declare("compute", vec![], TypeDescriptor::Void);
        iface
    }

    #[test]
    fn test_hash_is_deterministic() {
        let iface = overloaded_interface();
        let method = &iface.methods()[0];
        assert_eq!(method_hash(method).unwrap(), method_hash(method).unwrap());

        // Same descriptor on a different interface version hashes identically
        let other = MethodDescriptor::new(
            InterfaceId::new("com.acme.Calculator", 4),
            method.name.clone(),
            method.parameter_types.clone(),
            method.return_type.clone(),
        );
        assert_eq!(method_hash(method).unwrap(), method_hash(&other).unwrap());
    }

    #[test]
    fn test_overloads_hash_uniquely() {
        let iface = overloaded_interface();
        assert!(iface.methods().len() > 20);
        let hashes: HashSet<i64> = iface.methods().iter().map(|m| method_hash(m).unwrap()).collect();
        assert_eq!(hashes.len(), iface.methods().len());
    }

    #[test]
    fn test_cache_register_and_evict() {
        let cache = MethodHashCache::new();
        let iface = overloaded_interface();
        let map = cache.register_interface(&iface).unwrap();

        assert_eq!(map.len(), iface.methods().len());
        assert!(cache.contains(iface.id()));
        for method in iface.methods() {
            let hash = cache.hash_of(method).unwrap();
            assert_eq!(hash, method_hash(method).unwrap());
            assert_eq!(map.resolve(hash).unwrap(), *method);
        }

        assert!(cache.remove_hashes(iface.id()));
        assert!(!cache.remove_hashes(iface.id()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hash_of_populates_lazily() {
        let cache = MethodHashCache::new();
        let iface = overloaded_interface();
        let method = &iface.methods()[1];
        assert!(!cache.contains(iface.id()));
        let hash = cache.hash_of(method).unwrap();
        assert!(cache.contains(iface.id()));
        assert_eq!(cache.hash_of(method).unwrap(), hash);
    }

    #[test]
    fn test_unknown_hash_is_method_not_found() {
        let map = MethodMap::for_interface(&overloaded_interface()).unwrap();
        let err = map.resolve(12345).unwrap_err();
        assert_eq!(err, InvocationError::MethodNotFound { hash: 12345 });
    }

    #[test]
    fn test_oversized_descriptor_is_rejected() {
        let mut iface = InterfaceDescriptor::new(InterfaceId::new("com.acme.Huge", 1));
        let method = iface.declare("m".repeat(70_000), vec![], TypeDescriptor::Void);
        assert!(matches!(
            method_hash(&method),
            Err(InvocationError::InvalidInvocation(_))
        ));

        let cache = MethodHashCache::new();
        assert!(cache.hash_of(&method).is_err());
        assert!(cache.register_interface(&iface).is_err());
        assert!(!cache.contains(iface.id()));
        assert!(MethodMap::for_interface(&iface).is_err());
    }
}
