//! Class metadata adapter
//!
//! Domain classes are described to the engine as [`ClassDescriptor`]s and
//! registered in a [`TypeRegistry`]. A descriptor carries everything the
//! introspector needs: the class hierarchy, the methods with their
//! parameter and return types, constructors, and opaque key/value metadata
//! that facet factories read (the equivalent of annotations).
//!
//! Methods and constructors carry handles: closures that perform the actual
//! invocation against a [`ManagedObject`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashSet;

use morphe_types::{ManagedObject, Value};

use super::policy::EncapsulationPolicy;
use crate::error::{MetaModelError, MetaModelResult};

/// Invokes a method on a target with positional arguments
pub type MethodHandle =
    Arc<dyn Fn(&ManagedObject, &[Value]) -> Result<Value, String> + Send + Sync>;

/// Creates an instance from positional arguments
pub type ConstructorHandle = Arc<dyn Fn(&[Value]) -> Result<ManagedObject, String> + Send + Sync>;

// ============================================================================
// Metadata
// ============================================================================

/// A single metadata entry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// Presence-only marker
    Flag,
    /// Text value
    Text(String),
    /// Integer value
    Int(i64),
}

/// Opaque key/value metadata attached to classes, methods and parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry
    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.entries.insert(key.into(), value);
    }

    /// Check if a key is present
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get an entry
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Text value of an entry
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(MetadataValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer value of an entry
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(MetadataValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Iterate keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Check if no entries are present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Types
// ============================================================================

/// Reference to a parameter, return or element type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value
    Void,
    /// Built-in scalar such as `i64`, `bool` or `String`
    Scalar(String),
    /// Registered domain class
    Class(String),
    /// Collection of some element type
    Collection(Box<TypeRef>),
}

impl TypeRef {
    /// Scalar type
    pub fn scalar(name: &str) -> Self {
        TypeRef::Scalar(name.to_string())
    }

    /// Class type
    pub fn class(name: &str) -> Self {
        TypeRef::Class(name.to_string())
    }

    /// Collection type
    pub fn collection_of(element: TypeRef) -> Self {
        TypeRef::Collection(Box::new(element))
    }

    /// Check if this is the void type
    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    /// Check if this is a collection type
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeRef::Collection(_))
    }

    /// Check if this is the boolean scalar
    pub fn is_bool(&self) -> bool {
        matches!(self, TypeRef::Scalar(name) if name == "bool")
    }

    /// Element type of a collection, or the type itself
    pub fn element_type(&self) -> &TypeRef {
        match self {
            TypeRef::Collection(element) => element,
            other => other,
        }
    }

    /// Class name of this type or its element type
    pub fn class_name(&self) -> Option<&str> {
        match self.element_type() {
            TypeRef::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Name used in identifiers and diagnostics
    pub fn type_name(&self) -> String {
        match self {
            TypeRef::Void => "void".to_string(),
            TypeRef::Scalar(name) | TypeRef::Class(name) => name.clone(),
            TypeRef::Collection(element) => format!("Vec<{}>", element.type_name()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

// ============================================================================
// Methods and constructors
// ============================================================================

/// Method visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodVisibility {
    /// Callable from outside the class
    Public,
    /// Private, protected or package-level
    NonPublic,
}

/// A method or constructor parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    name: String,
    type_ref: TypeRef,
    metadata: Metadata,
}

impl ParameterDescriptor {
    /// Create a parameter
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            type_ref,
            metadata: Metadata::new(),
        }
    }

    /// Add a flag metadata entry
    pub fn with_metadata_flag(mut self, key: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Flag);
        self
    }

    /// Add a text metadata entry
    pub fn with_metadata_text(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Text(value.to_string()));
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Parameter metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Signature key used to detect overriding: name plus parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: String,
    parameter_types: Vec<TypeRef>,
}

/// A method of a domain class
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    declaring_class: String,
    parameters: Vec<ParameterDescriptor>,
    return_type: TypeRef,
    visibility: MethodVisibility,
    is_static: bool,
    is_synthetic: bool,
    is_bridge: bool,
    metadata: Metadata,
    handle: Option<MethodHandle>,
}

impl MethodDescriptor {
    /// Public instance method returning void
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declaring_class: String::new(),
            parameters: Vec::new(),
            return_type: TypeRef::Void,
            visibility: MethodVisibility::Public,
            is_static: false,
            is_synthetic: false,
            is_bridge: false,
            metadata: Metadata::new(),
            handle: None,
        }
    }

    /// Append a parameter
    pub fn with_param(self, name: &str, type_ref: TypeRef) -> Self {
        self.with_parameter(ParameterDescriptor::new(name, type_ref))
    }

    /// Append a fully described parameter
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the return type
    pub fn returning(mut self, return_type: TypeRef) -> Self {
        self.return_type = return_type;
        self
    }

    /// Make the method non-public
    pub fn non_public(mut self) -> Self {
        self.visibility = MethodVisibility::NonPublic;
        self
    }

    /// Make the method static
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as compiler-generated
    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }

    /// Mark as a bridge method
    pub fn bridge(mut self) -> Self {
        self.is_bridge = true;
        self
    }

    /// Add a flag metadata entry
    pub fn with_metadata_flag(mut self, key: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Flag);
        self
    }

    /// Add a text metadata entry
    pub fn with_metadata_text(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Text(value.to_string()));
        self
    }

    /// Add an integer metadata entry
    pub fn with_metadata_int(mut self, key: &str, value: i64) -> Self {
        self.metadata.insert(key, MetadataValue::Int(value));
        self
    }

    /// Attach the invocation handle
    pub fn with_handle<F>(mut self, handle: F) -> Self
    where
        F: Fn(&ManagedObject, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handle = Some(Arc::new(handle));
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class that declares the method
    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Return type
    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    /// Visibility
    pub fn visibility(&self) -> MethodVisibility {
        self.visibility
    }

    /// Check if the method is public
    pub fn is_public(&self) -> bool {
        self.visibility == MethodVisibility::Public
    }

    /// Check if the method is static
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Check if the method is compiler-generated
    pub fn is_synthetic(&self) -> bool {
        self.is_synthetic
    }

    /// Check if the method is a bridge method
    pub fn is_bridge(&self) -> bool {
        self.is_bridge
    }

    /// Method metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Invocation handle
    pub fn handle(&self) -> Option<&MethodHandle> {
        self.handle.as_ref()
    }

    /// Parameter type names, as used in action identifiers
    pub fn parameter_type_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.type_ref.type_name()).collect()
    }

    /// Overriding key
    pub fn key(&self) -> MethodKey {
        MethodKey {
            name: self.name.clone(),
            parameter_types: self.parameters.iter().map(|p| p.type_ref.clone()).collect(),
        }
    }

    /// Check if `other` is the same declared method
    pub fn same_method(&self, other: &MethodDescriptor) -> bool {
        self.declaring_class == other.declaring_class && self.key() == other.key()
    }

    /// Invoke the method
    pub fn invoke(&self, target: &ManagedObject, args: &[Value]) -> Result<Value, String> {
        match &self.handle {
            Some(handle) => handle(target, args),
            None => Err(format!(
                "{}.{} has no invocation handle",
                self.declaring_class, self.name
            )),
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("declaring_class", &self.declaring_class)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("visibility", &self.visibility)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A constructor of a domain class
#[derive(Clone, Default)]
pub struct ConstructorDescriptor {
    parameters: Vec<ParameterDescriptor>,
    handle: Option<ConstructorHandle>,
}

impl ConstructorDescriptor {
    /// Constructor without parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn with_param(mut self, name: &str, type_ref: TypeRef) -> Self {
        self.parameters.push(ParameterDescriptor::new(name, type_ref));
        self
    }

    /// Append a fully described parameter
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Attach the instantiation handle
    pub fn with_handle<F>(mut self, handle: F) -> Self
    where
        F: Fn(&[Value]) -> Result<ManagedObject, String> + Send + Sync + 'static,
    {
        self.handle = Some(Arc::new(handle));
        self
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Create an instance
    pub fn instantiate(&self, args: &[Value]) -> Result<ManagedObject, String> {
        match &self.handle {
            Some(handle) => handle(args),
            None => Err("constructor has no instantiation handle".to_string()),
        }
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Kind of domain class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Persistent domain object
    Entity,
    /// Non-persistent domain object
    ViewModel,
    /// Value type (no members of its own)
    Value,
    /// Contributes members to other types
    Mixin,
    /// Interface
    Interface,
    /// Abstract class
    Abstract,
}

/// Description of a domain class
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    name: String,
    logical_type_name: Option<String>,
    kind: ClassKind,
    superclass: Option<String>,
    interfaces: Vec<String>,
    methods: Vec<Arc<MethodDescriptor>>,
    constructors: Vec<ConstructorDescriptor>,
    metadata: Metadata,
}

impl ClassDescriptor {
    /// Create a descriptor
    pub fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            name: name.to_string(),
            logical_type_name: None,
            kind,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Set the logical type name (defaults to the class name)
    pub fn with_logical_type_name(mut self, logical_type_name: &str) -> Self {
        self.logical_type_name = Some(logical_type_name.to_string());
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Add a method declared by this class
    pub fn with_method(mut self, mut method: MethodDescriptor) -> Self {
        method.declaring_class = self.name.clone();
        self.methods.push(Arc::new(method));
        self
    }

    /// Add a constructor
    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a flag metadata entry
    pub fn with_metadata_flag(mut self, key: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Flag);
        self
    }

    /// Add a text metadata entry
    pub fn with_metadata_text(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key, MetadataValue::Text(value.to_string()));
        self
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical type name
    pub fn logical_type_name(&self) -> &str {
        self.logical_type_name.as_deref().unwrap_or(&self.name)
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Superclass name
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Implemented interface names
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Methods declared by this class (not inherited ones)
    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    /// Constructors
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// Class metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Check if this is a value type
    pub fn is_value(&self) -> bool {
        self.kind == ClassKind::Value
    }

    /// Check if this is a mixin
    pub fn is_mixin(&self) -> bool {
        self.kind == ClassKind::Mixin
    }

    /// Check if this is an interface or abstract class
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::Abstract)
    }

    /// Simple name: the part after the last `.` or `::`
    pub fn simple_name(&self) -> &str {
        let after_path = self.name.rsplit("::").next().unwrap_or(&self.name);
        after_path.rsplit('.').next().unwrap_or(after_path)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Thread-safe registry of class descriptors
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Descriptors by class name
    classes: DashMap<String, Arc<ClassDescriptor>>,
    /// Class name by logical type name
    logical_names: DashMap<String, String>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class
    pub fn register(&self, class: ClassDescriptor) -> MetaModelResult<Arc<ClassDescriptor>> {
        let class = Arc::new(class);
        let logical = class.logical_type_name().to_string();

        match self.logical_names.entry(logical.clone()) {
            Entry::Occupied(existing) => {
                if existing.get() == class.name() {
                    return Err(MetaModelError::DuplicateClass(class.name().to_string()));
                }
                return Err(MetaModelError::DuplicateLogicalType {
                    logical_type_name: logical,
                    existing: existing.get().clone(),
                    class: class.name().to_string(),
                });
            }
            Entry::Vacant(vacant) => {
                if self.classes.contains_key(class.name()) {
                    return Err(MetaModelError::DuplicateClass(class.name().to_string()));
                }
                vacant.insert(class.name().to_string());
            }
        }

        self.classes.insert(class.name().to_string(), class.clone());
        Ok(class)
    }

    /// Get a class by name
    pub fn get(&self, class_name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(class_name).map(|entry| entry.value().clone())
    }

    /// Check if a class is registered
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Class name registered under a logical type name
    pub fn class_name_for_logical(&self, logical_type_name: &str) -> Option<String> {
        self.logical_names
            .get(logical_type_name)
            .map(|entry| entry.value().clone())
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All registered class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Names of all registered mixin classes, sorted
    pub fn mixin_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .iter()
            .filter(|e| e.value().is_mixin())
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Check if `sub` is `sup` or inherits from it (superclasses and interfaces)
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        let mut visited = FxHashSet::default();
        let mut pending = vec![sub.to_string()];

        while let Some(name) = pending.pop() {
            if name == sup {
                return true;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(class) = self.get(&name) {
                if let Some(superclass) = class.superclass() {
                    pending.push(superclass.to_string());
                }
                pending.extend(class.interfaces().iter().cloned());
            }
        }
        false
    }

    /// Candidate methods of a class: its own methods followed by inherited
    /// ones that it does not override, filtered by visibility.
    pub fn candidate_methods(
        &self,
        class_name: &str,
        encapsulation: EncapsulationPolicy,
    ) -> Vec<Arc<MethodDescriptor>> {
        let mut seen_keys = FxHashSet::default();
        let mut visited = FxHashSet::default();
        let mut methods = Vec::new();
        let mut current = self.get(class_name);

        while let Some(class) = current {
            if !visited.insert(class.name().to_string()) {
                break;
            }
            for method in class.methods() {
                if encapsulation == EncapsulationPolicy::OnlyPublic && !method.is_public() {
                    continue;
                }
                if seen_keys.insert(method.key()) {
                    methods.push(method.clone());
                }
            }
            current = class.superclass().and_then(|name| self.get(name));
        }

        methods
    }
}
