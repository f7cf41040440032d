//! Generics: C aggregates used over an element type C cannot express.
//!
//! A generic is registered from its typedef (`RzList`), and every use of the
//! backing struct elsewhere must say which element type it holds with a
//! `/*<T>*/` comment. Each distinct `T` becomes one instantiation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::binding::errors::BindError;
use crate::binding::func::Func;
use crate::core::decl::{DeclKind, SourceLocation};
use crate::core::header::Header;

/// Whether annotations of a generic must name a pointer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPolicy {
    /// `/*<RzBinSymbol *>*/`, registering `RzBinSymbol`
    Required,
    /// `/*<ut64>*/`; a trailing `*` is rejected
    #[default]
    Forbidden,
}

/// How to register a generic.
#[derive(Debug, Clone)]
pub struct GenericSpec {
    pub typedef: String,
    pub pointer: PointerPolicy,
    pub dependencies: Vec<String>,
}

impl GenericSpec {
    pub fn new(typedef: impl Into<String>) -> Self {
        GenericSpec {
            typedef: typedef.into(),
            pointer: PointerPolicy::Forbidden,
            dependencies: Vec::new(),
        }
    }

    /// Require pointer annotations.
    pub fn pointer(mut self) -> Self {
        self.pointer = PointerPolicy::Required;
        self
    }

    /// Instantiate `dependency` alongside every instantiation of this generic.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

/// A registered generic.
#[derive(Debug)]
pub struct Generic {
    /// Typedef name, also the prefix of every instantiation
    pub name: String,
    pub struct_name: String,
    pub pointer: PointerPolicy,
    pub dependencies: Vec<String>,
    pub specializations: BTreeSet<String>,
    pub methods: Vec<(String, Func)>,
    /// Python methods added to every instantiation, keyed by signature
    pub python_methods: Vec<(String, Vec<String>)>,
    /// Extra `%extend` lines for single instantiations
    pub extensions: BTreeMap<String, Vec<String>>,
}

impl Generic {
    /// Register a generic from its typedef in `header`.
    pub(crate) fn bind(header: &mut Header, spec: GenericSpec) -> Result<Self, BindError> {
        let typedef = header.pop(DeclKind::Typedef, &spec.typedef)?;
        let struct_name = match typedef.ty.as_ref().and_then(|t| t.record_name()) {
            Some(name) => name.to_string(),
            None => {
                return Err(BindError::WrongUnderlying {
                    name: spec.typedef,
                    expected: "a struct",
                    found: typedef
                        .ty
                        .as_ref()
                        .map(|t| t.spelling.clone())
                        .unwrap_or_default(),
                    location: typedef.location.clone(),
                })
            }
        };

        tracing::debug!("Registered generic {} over struct {}", spec.typedef, struct_name);
        Ok(Generic {
            name: spec.typedef,
            struct_name,
            pointer: spec.pointer,
            dependencies: spec.dependencies,
            specializations: BTreeSet::new(),
            methods: Vec::new(),
            python_methods: Vec::new(),
            extensions: BTreeMap::new(),
        })
    }

    /// Validate an annotation token against the pointer policy.
    ///
    /// Returns the specialization key.
    pub fn key(&self, token: &str, location: &SourceLocation) -> Result<String, BindError> {
        specialization_key(&self.name, self.pointer, token, location)
    }

    pub(crate) fn insert_method(&mut self, name: String, func: Func) -> Result<(), BindError> {
        if self.methods.iter().any(|(n, _)| *n == name) {
            return Err(BindError::DuplicateMethod {
                entity: self.name.clone(),
                method: name,
                location: func.cfunc.location.clone(),
            });
        }
        self.methods.push((name, func));
        Ok(())
    }
}

/// Strip a leading `const ` and surrounding whitespace.
pub fn normalize(token: &str) -> &str {
    let mut token = token.trim();
    while let Some(rest) = token.strip_prefix("const ") {
        token = rest.trim_start();
    }
    token.trim_end()
}

/// Turn an annotation token into a specialization key.
pub fn specialization_key(
    generic: &str,
    policy: PointerPolicy,
    token: &str,
    location: &SourceLocation,
) -> Result<String, BindError> {
    let name = normalize(token);
    let violation = |reason: &'static str| BindError::PointerPolicy {
        generic: generic.to_string(),
        token: token.to_string(),
        reason,
        location: location.clone(),
    };

    if name.is_empty() {
        return Err(violation("is empty"));
    }

    match policy {
        PointerPolicy::Required => {
            if !name.ends_with('*') {
                return Err(violation("lacks pointer"));
            }
            match name.strip_suffix(" *") {
                Some(key) if !key.trim().is_empty() => Ok(key.trim_end().to_string()),
                Some(_) => Err(violation("is empty")),
                None => Err(violation("lacks space before pointer")),
            }
        }
        PointerPolicy::Forbidden => {
            if name.ends_with('*') {
                Err(violation("has pointer"))
            } else {
                Ok(name.to_string())
            }
        }
    }
}

/// Every registered generic, by name and by backing struct.
#[derive(Debug, Default)]
pub struct GenericRegistry {
    generics: Vec<Generic>,
    by_name: HashMap<String, usize>,
    by_struct: HashMap<String, usize>,
    /// Keys recorded for dependencies that are not registered yet
    pending: HashMap<String, BTreeSet<String>>,
}

impl GenericRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mut generic: Generic) -> Result<(), BindError> {
        if self.by_name.contains_key(&generic.name) {
            return Err(BindError::DuplicateEntity {
                kind: "generic",
                name: generic.name,
            });
        }
        if let Some(keys) = self.pending.remove(&generic.name) {
            generic.specializations.extend(keys);
        }
        let index = self.generics.len();
        self.by_name.insert(generic.name.clone(), index);
        self.by_struct.insert(generic.struct_name.clone(), index);
        self.generics.push(generic);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Generic> {
        self.by_name.get(name).map(|&i| &self.generics[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Generic> {
        self.by_name.get(name).map(|&i| &mut self.generics[i])
    }

    /// The generic backed by `struct_name`.
    pub fn for_struct(&self, struct_name: &str) -> Option<&Generic> {
        self.by_struct.get(struct_name).map(|&i| &self.generics[i])
    }

    /// Generics in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Generic> {
        self.generics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.generics.is_empty()
    }

    /// Record `key` for `generic` and, one level deep, its dependencies.
    pub fn record(&mut self, generic: &str, key: &str) {
        let Some(&index) = self.by_name.get(generic) else {
            return;
        };
        self.generics[index].specializations.insert(key.to_string());

        let dependencies = self.generics[index].dependencies.clone();
        for dependency in dependencies {
            match self.by_name.get(&dependency) {
                Some(&i) => {
                    self.generics[i].specializations.insert(key.to_string());
                }
                None => {
                    self.pending
                        .entry(dependency)
                        .or_default()
                        .insert(key.to_string());
                }
            }
        }
    }

    /// Check that every dependency is registered and that there are no cycles.
    pub fn validate(&self) -> Result<(), BindError> {
        for generic in &self.generics {
            for dependency in &generic.dependencies {
                if !self.by_name.contains_key(dependency) {
                    return Err(BindError::UnknownDependency {
                        generic: generic.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            for specialization in generic.extensions.keys() {
                if !generic.specializations.contains(specialization) {
                    return Err(BindError::UnknownSpecialization {
                        generic: generic.name.clone(),
                        specialization: specialization.clone(),
                        known: generic.specializations.iter().cloned().collect(),
                    });
                }
            }
        }
        self.dependency_order().map(|_| ())
    }

    /// Generics with every dependency before its dependents.
    pub fn dependency_order(&self) -> Result<Vec<&Generic>, BindError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.generics.len()).map(|i| graph.add_node(i)).collect();

        for (i, generic) in self.generics.iter().enumerate() {
            for dependency in &generic.dependencies {
                if let Some(&d) = self.by_name.get(dependency) {
                    graph.add_edge(nodes[d], nodes[i], ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| &self.generics[graph[n]]).collect()),
            Err(cycle) => {
                let members = kosaraju_scc(&graph)
                    .into_iter()
                    .find(|scc| scc.contains(&cycle.node_id()))
                    .unwrap_or_else(|| vec![cycle.node_id()]);
                let mut generics: Vec<String> = members
                    .iter()
                    .map(|&n| self.generics[graph[n]].name.clone())
                    .collect();
                generics.sort();
                if let Some(first) = generics.first().cloned() {
                    generics.push(first);
                }
                Err(BindError::DependencyCycle { generics })
            }
        }
    }
}
