// src/core/resolver.rs
//! Discriminated-union resolution by keychain.
//!
//! A master type (a rich-text span, a parent, a property value…) is an enum
//! whose concrete variant is announced by a discriminator field in the JSON.
//! The discriminator may nest: a user mention is
//! `{"type": "mention", "mention": {"type": "user", ...}}`, so the sequence of
//! discriminator values, its [`Keychain`], is what identifies the variant.
//!
//! Every master owns a static [`KeychainRegistry`] mapping keychains to
//! constructors. Keychains are declared, never computed: either explicitly
//! through [`KeychainRegistry::register`] or through a variant type's
//! [`Variant::KEYCHAIN`].

use super::serialization::{json_type_name, Deserializable};
use crate::error::{RegistryError, SerializationError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Ordered discriminator values identifying one concrete variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keychain(Vec<String>);

impl Keychain {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// Reads the keychain of a JSON payload.
    ///
    /// Starts at `value[key]`, then keeps descending into `value[<that value>]`
    /// for as long as the nested object carries `key` itself.
    pub fn from_shape(value: &Value, key: &str) -> Result<Self, SerializationError> {
        let mut chain = Vec::new();
        let mut current = value;
        loop {
            let Some(object) = current.as_object() else {
                return Err(SerializationError::new(format!(
                    "cannot read discriminator '{}' from {}",
                    key,
                    json_type_name(current)
                ))
                .with_value(current));
            };
            let Some(discriminator) = object.get(key) else {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                return Err(
                    SerializationError::new(format!("discriminator '{}' is missing", key))
                        .with_var("keys", keys),
                );
            };
            let Some(name) = discriminator.as_str() else {
                return Err(SerializationError::new(format!(
                    "discriminator '{}' must be a string",
                    key
                ))
                .with_value(discriminator)
                .at(key));
            };
            chain.push(name.to_string());

            match object.get(name) {
                Some(nested @ Value::Object(inner)) if inner.contains_key(key) => current = nested,
                _ => return Ok(Self(chain)),
            }
        }
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[&str]> for Keychain {
    fn from(values: &[&str]) -> Self {
        Self::new(values.iter().copied())
    }
}

impl fmt::Display for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Builds a master value from a payload already known to carry a given keychain.
pub type Constructor<M> = fn(&Value) -> Result<M, SerializationError>;

/// A concrete variant type of master `M`, with its declared keychain.
pub trait Variant<M>: Deserializable + Into<M> {
    const KEYCHAIN: &'static [&'static str];
}

fn construct_variant<M, V: Variant<M>>(value: &Value) -> Result<M, SerializationError> {
    V::deserialize(value).map(Into::into)
}

/// Keychain → constructor table of one master type.
pub struct KeychainRegistry<M> {
    master: &'static str,
    key: &'static str,
    constructors: IndexMap<Keychain, Constructor<M>>,
}

impl<M> KeychainRegistry<M> {
    pub fn new(master: &'static str, key: &'static str) -> Self {
        Self {
            master,
            key,
            constructors: IndexMap::new(),
        }
    }

    /// Builds a registry for a `static`, panicking on an inconsistent table.
    ///
    /// Registration runs once, when the registry is first touched, so a
    /// duplicate keychain surfaces before any payload is resolved.
    pub fn with_variants(
        master: &'static str,
        key: &'static str,
        setup: impl FnOnce(&mut Self) -> Result<(), RegistryError>,
    ) -> Self {
        let mut registry = Self::new(master, key);
        if let Err(err) = setup(&mut registry) {
            panic!("invalid keychain registry: {}", err);
        }
        registry
    }

    pub fn register(
        &mut self,
        keychain: Keychain,
        constructor: Constructor<M>,
    ) -> Result<(), RegistryError> {
        if keychain.is_empty() {
            return Err(RegistryError::EmptyKeychain {
                master: self.master.to_string(),
            });
        }
        if self.constructors.contains_key(&keychain) {
            return Err(RegistryError::DuplicateKeychain {
                master: self.master.to_string(),
                keychain: keychain.to_string(),
            });
        }
        log::trace!("{}: registered keychain {}", self.master, keychain);
        self.constructors.insert(keychain, constructor);
        Ok(())
    }

    pub fn register_variant<V: Variant<M>>(&mut self) -> Result<(), RegistryError> {
        self.register(Keychain::from(V::KEYCHAIN), construct_variant::<M, V>)
    }

    pub fn master(&self) -> &'static str {
        self.master
    }

    /// The discriminator field name, `"type"` or `"object"`.
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn knows(&self, keychain: &Keychain) -> bool {
        self.constructors.contains_key(keychain)
    }

    pub fn keychains(&self) -> impl Iterator<Item = &Keychain> {
        self.constructors.keys()
    }

    pub fn resolve(&self, value: &Value) -> Result<M, SerializationError> {
        let keychain = Keychain::from_shape(value, self.key).map_err(|e| {
            SerializationError::new(format!("cannot resolve {}", self.master))
                .with_cause("keychain", e)
        })?;
        let constructor = self.constructors.get(&keychain).ok_or_else(|| {
            SerializationError::new(format!("{} has no variant for keychain", self.master))
                .with_var("keychain", keychain.values())
        })?;
        constructor(value)
    }
}

impl<M> fmt::Debug for KeychainRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeychainRegistry")
            .field("master", &self.master)
            .field("key", &self.key)
            .field("keychains", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An enum resolved through a static keychain registry.
pub trait MasterType: Sized + 'static {
    const NAME: &'static str;

    fn registry() -> &'static KeychainRegistry<Self>;
}

pub fn resolve<M: MasterType>(value: &Value) -> Result<M, SerializationError> {
    M::registry().resolve(value)
}
