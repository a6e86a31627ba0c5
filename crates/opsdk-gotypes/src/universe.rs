//! Package index over Go sources
//!
//! A [`Universe`] holds every package found under a directory. Packages are
//! directories; a package's name comes from its `package` clause. Type
//! references qualified with an import name (`metav1.ObjectMeta`) resolve to
//! the indexed package carrying that name, if any.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use opsdk_core::FileSystem;

use crate::ast::{Member, SourceFile, TypeDecl, TypeExpr};
use crate::error::{GoTypesError, Result};
use crate::parser;

/// Named-type hops followed before giving up on a definition chain
const MAX_TYPE_HOPS: usize = 16;

/// One Go package (a directory of `.go` files)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub path: PathBuf,
    pub name: String,
    pub types: IndexMap<String, TypeDecl>,
}

impl Package {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            types: IndexMap::new(),
        }
    }

    /// Merge the type declarations of one parsed file
    pub fn add_file(&mut self, file: SourceFile) {
        for decl in file.types {
            self.types.insert(decl.name.clone(), decl);
        }
    }

    /// Builder used mostly in tests
    pub fn with_file(mut self, file: SourceFile) -> Self {
        self.add_file(file);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }
}

/// Struct members reached from a type, with enough context to keep walking
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Package the members were declared in
    pub package: &'a Package,
    pub members: &'a [Member],
    /// `<package path>.<type name>` for named structs, `None` for anonymous ones
    pub key: Option<ResolvedKey<'a>>,
}

/// Identity of a named struct type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedKey<'a> {
    pub package: &'a Path,
    pub name: &'a str,
}

impl std::fmt::Display for ResolvedKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.package.display(), self.name)
    }
}

/// All packages known to a generator run
#[derive(Debug, Clone, Default)]
pub struct Universe {
    packages: Vec<Package>,
}

impl Universe {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Package rooted at `path`, ignoring `.` components
    pub fn package(&self, path: &Path) -> Option<&Package> {
        self.packages.iter().find(|p| same_path(&p.path, path))
    }

    /// First package whose `package` clause is `name`
    pub fn package_named(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Look up the declaration a named type refers to from inside `scope`
    pub fn lookup<'a>(
        &'a self,
        scope: &'a Package,
        package: Option<&str>,
        name: &str,
    ) -> Option<(&'a Package, &'a TypeDecl)> {
        let pkg = match package {
            Some(qualifier) => self.package_named(qualifier)?,
            None => scope,
        };
        pkg.get(name).map(|decl| (pkg, decl))
    }

    /// Struct members of `ty` as seen from `scope`
    ///
    /// One level of pointer, slice, array, map or channel is looked through;
    /// named types are followed to their struct definition. Anything else has
    /// no members.
    pub fn members_of<'a>(&'a self, scope: &'a Package, ty: &'a TypeExpr) -> Option<Resolved<'a>> {
        let ty = ty.elem().unwrap_or(ty);

        let (mut pkg, mut decl) = match ty {
            TypeExpr::Struct(members) => {
                return Some(Resolved {
                    package: scope,
                    members,
                    key: None,
                });
            }
            TypeExpr::Named { package, name } => self.lookup(scope, package.as_deref(), name)?,
            _ => return None,
        };

        for _ in 0..MAX_TYPE_HOPS {
            match &decl.ty {
                TypeExpr::Struct(members) => {
                    return Some(Resolved {
                        package: pkg,
                        members,
                        key: Some(ResolvedKey {
                            package: &pkg.path,
                            name: &decl.name,
                        }),
                    });
                }
                TypeExpr::Named { package, name } => {
                    (pkg, decl) = self.lookup(pkg, package.as_deref(), name)?;
                }
                _ => return None,
            }
        }

        tracing::debug!(type_name = %decl.name, "type definition chain too deep");
        None
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    fn significant(p: &Path) -> Vec<Component<'_>> {
        p.components().filter(|c| !matches!(c, Component::CurDir)).collect()
    }
    significant(a) == significant(b)
}

/// Source of the packages a generator inspects
pub trait TypeUniverseProvider {
    /// Index every package at or below `dir`
    fn list_packages(&self, dir: &Path) -> Result<Universe>;
}

/// Indexes Go packages by parsing `.go` files from a [`FileSystem`]
pub struct GoSourceIndexer<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> GoSourceIndexer<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }
}

impl TypeUniverseProvider for GoSourceIndexer<'_> {
    fn list_packages(&self, dir: &Path) -> Result<Universe> {
        if !self.fs.is_dir(dir) {
            return Err(GoTypesError::DirNotFound(dir.to_path_buf()));
        }

        let mut by_dir: BTreeMap<PathBuf, Package> = BTreeMap::new();

        for path in self.fs.walk_files(dir)? {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(".go") || file_name.ends_with("_test.go") {
                continue;
            }

            let source = self.fs.read_to_string(&path)?;
            let file = parser::parse(&source).map_err(|source| GoTypesError::Parse {
                path: path.clone(),
                source,
            })?;

            let pkg_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let pkg = by_dir
                .entry(pkg_dir.clone())
                .or_insert_with(|| Package::new(pkg_dir, file.package.clone()));

            if pkg.name != file.package {
                tracing::warn!(
                    path = %path.display(),
                    expected = %pkg.name,
                    found = %file.package,
                    "skipping file from a different package"
                );
                continue;
            }

            tracing::trace!(path = %path.display(), types = file.types.len(), "indexed Go file");
            pkg.add_file(file);
        }

        Ok(Universe::new(by_dir.into_values().collect()))
    }
}
