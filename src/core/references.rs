//! Memoized symbol references and the external resolver registry.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::model::{ReferenceKind, ReferenceType};
use super::program::SymbolKey;

/// Turns a symbol that leaves the analyzed projects into a link
pub trait ExternalResolver: Send {
    /// `specifier` is the full import specifier, `None` for ambient globals
    fn resolve(&self, name: &str, specifier: Option<&str>) -> Option<String>;
}

/// Link template resolver with `{name}`, `{specifier}` and `{package}` placeholders
#[derive(Debug, Clone)]
pub struct UrlTemplateResolver {
    template: String,
    names: HashSet<String>,
}

impl UrlTemplateResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            names: HashSet::new(),
        }
    }

    /// Restrict the resolver to the given names
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl ExternalResolver for UrlTemplateResolver {
    fn resolve(&self, name: &str, specifier: Option<&str>) -> Option<String> {
        if !self.names.is_empty() && !self.names.contains(name) {
            return None;
        }
        let specifier = specifier.unwrap_or_default();
        Some(
            self.template
                .replace("{name}", name)
                .replace("{specifier}", specifier)
                .replace("{package}", package_key(specifier)),
        )
    }
}

/// ECMAScript and DOM globals, linked to MDN
#[derive(Debug, Clone, Default)]
pub struct GlobalsResolver;

const ECMASCRIPT_GLOBALS: &[&str] = &[
    "Array", "ArrayBuffer", "BigInt", "Boolean", "DataView", "Date", "Error", "EvalError",
    "Float32Array", "Float64Array", "Function", "Int8Array", "Int16Array", "Int32Array",
    "Intl", "Iterator", "JSON", "Map", "Math", "Number", "Object", "Promise", "Proxy",
    "RangeError", "ReferenceError", "Reflect", "RegExp", "Set", "String", "Symbol",
    "SyntaxError", "TypeError", "Uint8Array", "Uint16Array", "Uint32Array", "URIError",
    "WeakMap", "WeakRef", "WeakSet",
];

const WEB_API_GLOBALS: &[&str] = &[
    "AbortController", "AbortSignal", "Blob", "Document", "Element", "Event", "EventTarget",
    "File", "FormData", "Headers", "HTMLElement", "ReadableStream", "Request", "Response",
    "URL", "URLSearchParams", "WebSocket", "Window", "WritableStream",
];

const TYPESCRIPT_UTILITY_TYPES: &[&str] = &[
    "Awaited", "Exclude", "Extract", "InstanceType", "NonNullable", "Omit", "Parameters",
    "Partial", "Pick", "Readonly", "Record", "Required", "ReturnType",
];

impl ExternalResolver for GlobalsResolver {
    fn resolve(&self, name: &str, specifier: Option<&str>) -> Option<String> {
        // Only ambient names; imported ones belong to their package
        if specifier.is_some() {
            return None;
        }
        if ECMASCRIPT_GLOBALS.contains(&name) {
            Some(format!(
                "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/{}",
                name
            ))
        } else if WEB_API_GLOBALS.contains(&name) {
            Some(format!("https://developer.mozilla.org/en-US/docs/Web/API/{}", name))
        } else if TYPESCRIPT_UTILITY_TYPES.contains(&name) {
            Some(format!(
                "https://www.typescriptlang.org/docs/handbook/utility-types.html#{}type",
                name.to_lowercase()
            ))
        } else {
            None
        }
    }
}

struct NamedResolver {
    resolver: Box<dyn ExternalResolver>,
    kind_accurate: bool,
}

/// Symbol to reference table plus external resolvers
#[derive(Default)]
pub struct ReferenceManager {
    table: HashMap<SymbolKey, ReferenceType>,
    named: HashMap<String, NamedResolver>,
    fallback: Vec<Box<dyn ExternalResolver>>,
}

impl ReferenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SymbolKey) -> Option<&ReferenceType> {
        self.table.get(key)
    }

    /// Record a reference; an existing entry is never overwritten
    pub fn set(&mut self, key: SymbolKey, reference: ReferenceType) -> &ReferenceType {
        let entry = self.table.entry(key);
        if let std::collections::hash_map::Entry::Occupied(existing) = &entry {
            if existing.get() != &reference {
                warn!(
                    "Symbol {:?} already resolved to {:?}, ignoring {:?}",
                    existing.key(),
                    existing.get().name,
                    reference.name
                );
            }
        }
        entry.or_insert(reference)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Register a resolver for one package, checked before any fallback
    pub fn register_named(
        &mut self,
        package: impl Into<String>,
        resolver: Box<dyn ExternalResolver>,
        kind_accurate: bool,
    ) {
        let package = package.into();
        if self.named.contains_key(&package) {
            warn!("Replacing external resolver for {}", package);
        }
        self.named.insert(package, NamedResolver { resolver, kind_accurate });
    }

    /// Register a fallback resolver, tried in registration order
    pub fn register_fallback(&mut self, resolver: Box<dyn ExternalResolver>) {
        self.fallback.push(resolver);
    }

    /// Whether names from this specifier's package should be classified by kind
    pub fn is_kind_accurate(&self, specifier: &str) -> bool {
        self.named
            .get(package_key(specifier))
            .map(|named| named.kind_accurate)
            .unwrap_or(false)
    }

    /// Packages whose names are classified through the library index
    pub fn kind_accurate_packages(&self) -> impl Iterator<Item = &str> {
        self.named
            .iter()
            .filter(|(_, named)| named.kind_accurate)
            .map(|(package, _)| package.as_str())
    }

    /// Resolve a symbol outside every analyzed project.
    ///
    /// A resolver registered under the specifier's package key wins; otherwise
    /// fallbacks are tried in order. `kind` overrides the generic External tag
    /// when the caller classified the name.
    pub fn find_external(
        &self,
        name: &str,
        specifier: Option<&str>,
        kind: Option<ReferenceKind>,
    ) -> Option<ReferenceType> {
        if let Some(specifier) = specifier {
            if let Some(named) = self.named.get(package_key(specifier)) {
                let link = named.resolver.resolve(name, Some(specifier))?;
                let kind = if named.kind_accurate {
                    kind.unwrap_or(ReferenceKind::External)
                } else {
                    ReferenceKind::External
                };
                return Some(ReferenceType::external(name, link, kind));
            }
        }

        let link = self
            .fallback
            .iter()
            .find_map(|resolver| resolver.resolve(name, specifier));
        if link.is_none() {
            debug!("No external resolver claimed {} ({:?})", name, specifier);
        }
        link.map(|link| ReferenceType::external(name, link, ReferenceKind::External))
    }
}

/// Package part of a bare specifier: `react/jsx` -> `react`, `@scope/pkg/x` -> `@scope/pkg`
pub fn package_key(specifier: &str) -> &str {
    let mut separators = specifier.match_indices('/').map(|(index, _)| index);
    let end = if specifier.starts_with('@') {
        separators.nth(1)
    } else {
        separators.next()
    };
    &specifier[..end.unwrap_or(specifier.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn key(name: &str) -> SymbolKey {
        SymbolKey::Declaration {
            file: PathBuf::from("/p/a.ts"),
            name: name.to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_package_key() {
        assert_eq!(package_key("react"), "react");
        assert_eq!(package_key("react/something"), "react");
        assert_eq!(package_key("@scope/pkg/deep/path"), "@scope/pkg");
        assert_eq!(package_key("@scope/pkg"), "@scope/pkg");
    }

    #[test]
    fn test_set_never_overwrites() {
        let mut manager = ReferenceManager::new();
        let first = ReferenceType::declared("A", ReferenceKind::Class, "p", vec![], "p");
        let second = ReferenceType::declared("A", ReferenceKind::Interface, "p", vec![], "p");

        manager.set(key("A"), first.clone());
        let kept = manager.set(key("A"), second).clone();

        assert_eq!(kept, first);
        assert_eq!(manager.get(&key("A")), Some(&first));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_named_resolver_precedes_fallback() {
        let mut manager = ReferenceManager::new();
        manager.register_fallback(Box::new(UrlTemplateResolver::new("https://fallback/{name}")));
        manager.register_named(
            "react",
            Box::new(UrlTemplateResolver::new("https://react.dev/{specifier}#{name}")),
            false,
        );

        let reference = manager
            .find_external("useState", Some("react/something"), None)
            .unwrap();
        assert_eq!(reference.link.as_deref(), Some("https://react.dev/react/something#useState"));
        assert_eq!(reference.kind, ReferenceKind::External);

        let other = manager.find_external("x", Some("vue"), None).unwrap();
        assert_eq!(other.link.as_deref(), Some("https://fallback/x"));
    }

    #[test]
    fn test_fallbacks_in_registration_order() {
        let mut manager = ReferenceManager::new();
        manager.register_fallback(Box::new(
            UrlTemplateResolver::new("https://nodejs.org/api/{name}").with_names(["Buffer"]),
        ));
        manager.register_fallback(Box::new(GlobalsResolver));

        let buffer = manager.find_external("Buffer", None, None).unwrap();
        assert_eq!(buffer.link.as_deref(), Some("https://nodejs.org/api/Buffer"));

        let promise = manager.find_external("Promise", None, None).unwrap();
        assert!(promise.link.unwrap().ends_with("Global_Objects/Promise"));

        assert!(manager.find_external("NotAGlobal", None, None).is_none());
    }

    #[test]
    fn test_kind_accuracy_is_opt_in() {
        let mut manager = ReferenceManager::new();
        manager.register_named("lib", Box::new(UrlTemplateResolver::new("https://lib/{name}")), true);
        manager.register_named("plain", Box::new(UrlTemplateResolver::new("https://plain/{name}")), false);

        assert!(manager.is_kind_accurate("lib/sub"));
        assert!(!manager.is_kind_accurate("plain"));

        let classified = manager.find_external("Widget", Some("lib"), Some(ReferenceKind::Class)).unwrap();
        assert_eq!(classified.kind, ReferenceKind::Class);

        let generic = manager.find_external("Widget", Some("plain"), Some(ReferenceKind::Class)).unwrap();
        assert_eq!(generic.kind, ReferenceKind::External);
    }

    #[test]
    fn test_named_resolver_miss_is_no_match() {
        let mut manager = ReferenceManager::new();
        manager.register_named(
            "react",
            Box::new(UrlTemplateResolver::new("https://react.dev/{name}").with_names(["useState"])),
            false,
        );
        manager.register_fallback(Box::new(UrlTemplateResolver::new("https://fallback/{name}")));

        assert!(manager.find_external("useEffect", Some("react"), None).is_none());
    }
}
