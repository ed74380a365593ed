//! Route table loading.
//!
//! # Data Flow
//! ```text
//! RouteSource (directory listing)
//!     → walk depth-first, entries sorted by name
//!     → skip non-route extensions
//!     → pattern.rs builds the pattern from (directory, file name)
//!     → RouteRegistry supplies the module for the file key
//!     → RouteTable (load order, duplicates replaced in place)
//! ```
//!
//! # Design Decisions
//! - Only a failure to list the root aborts loading
//! - Parameter name conflicts are warnings, never errors
//! - Files without a registered module are skipped with a warning

use std::fmt;
use std::io;

use thiserror::Error;

use crate::routing::pattern::{build_pattern, declared_params, route_stem};
use crate::routing::registry::RouteRegistry;
use crate::routing::source::{RouteSource, SourceEntry};
use crate::routing::table::{RouteEntry, RouteTable};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read routes directory {location}: {source}")]
    ReadRoot {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("route loading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Non-fatal problem found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// `param` is declared again below a directory that already declares it.
    ParamConflict {
        param: String,
        path: String,
        ancestor: String,
    },
    /// `param` appears twice in one file or directory name.
    RepeatedParam { param: String, path: String },
    /// Two files produced the same pattern; the later one won.
    DuplicatePattern {
        pattern: String,
        replaced: String,
        by: String,
    },
    /// A route file has no registered module.
    Unregistered { file: String },
    /// A sub-directory could not be listed.
    UnreadableDir { dir: String, error: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::ParamConflict { param, path, ancestor } => write!(
                f,
                "parameter \"{}\" in route \"{}\" conflicts with parent route \"{}\"",
                param, path, ancestor
            ),
            LoadWarning::RepeatedParam { param, path } => {
                write!(f, "parameter \"{}\" is declared more than once in \"{}\"", param, path)
            }
            LoadWarning::DuplicatePattern { pattern, replaced, by } => {
                write!(f, "route \"{}\" from \"{}\" replaced by \"{}\"", pattern, replaced, by)
            }
            LoadWarning::Unregistered { file } => {
                write!(f, "route file \"{}\" has no registered module", file)
            }
            LoadWarning::UnreadableDir { dir, error } => {
                write!(f, "could not read routes directory \"{}\": {}", dir, error)
            }
        }
    }
}

/// Summary of one load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub routes: usize,
    pub warnings: Vec<LoadWarning>,
}

/// Build a route table by walking `source`.
pub fn load_routes(source: &dyn RouteSource, registry: &RouteRegistry) -> Result<(RouteTable, LoadReport), LoadError> {
    let root = source.read_dir("").map_err(|e| LoadError::ReadRoot {
        location: source.describe(),
        source: e,
    })?;

    let mut walker = Walker {
        source,
        registry,
        table: RouteTable::new(),
        warnings: Vec::new(),
    };
    walker.walk_entries("", root, &mut Vec::new());

    let report = LoadReport {
        routes: walker.table.len(),
        warnings: walker.warnings,
    };
    tracing::info!(
        source = %source.describe(),
        routes = report.routes,
        warnings = report.warnings.len(),
        "Routes loaded"
    );
    Ok((walker.table, report))
}

/// Parameters declared by an ancestor directory.
struct Declared {
    param: String,
    path: String,
}

struct Walker<'a> {
    source: &'a dyn RouteSource,
    registry: &'a RouteRegistry,
    table: RouteTable,
    warnings: Vec<LoadWarning>,
}

impl Walker<'_> {
    fn warn(&mut self, warning: LoadWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn walk_entries(
        &mut self,
        dir: &str,
        mut entries: Vec<SourceEntry>,
        ancestors: &mut Vec<Declared>,
    ) {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in entries {
            let path = join(dir, &entry.name);

            if entry.is_dir {
                let declared = self.check_params(&entry.name, &path, ancestors);
                let depth = ancestors.len();
                ancestors.extend(declared.into_iter().map(|param| Declared {
                    param,
                    path: path.clone(),
                }));

                match self.source.read_dir(&path) {
                    Ok(children) => self.walk_entries(&path, children, ancestors),
                    Err(e) => self.warn(LoadWarning::UnreadableDir {
                        dir: path.clone(),
                        error: e.to_string(),
                    }),
                }
                ancestors.truncate(depth);
                continue;
            }

            let Some(stem) = route_stem(&entry.name) else {
                continue;
            };
            let key = join(dir, stem);
            self.check_params(stem, &key, ancestors);
            self.add_file(dir, &entry.name, key);
        }
    }

    fn add_file(&mut self, dir: &str, file_name: &str, key: String) {
        let registry = self.registry;
        let Some(module) = registry.get(&key) else {
            self.warn(LoadWarning::Unregistered { file: key });
            return;
        };

        let pattern = build_pattern(dir, file_name);
        tracing::debug!(pattern = %pattern, file = %key, "Registering route");

        if let Some(replaced) = self.table.insert(RouteEntry::new(pattern.clone(), key.clone(), module)) {
            self.warn(LoadWarning::DuplicatePattern {
                pattern,
                replaced: replaced.file().to_string(),
                by: key,
            });
        }
    }

    /// Warn about names reused from ancestors or within `name`; return the
    /// names `name` declares.
    fn check_params(&mut self, name: &str, path: &str, ancestors: &[Declared]) -> Vec<String> {
        let declared = declared_params(name);
        let mut seen: Vec<&str> = Vec::new();

        for param in &declared {
            if let Some(ancestor) = ancestors.iter().find(|d| &d.param == param) {
                let warning = LoadWarning::ParamConflict {
                    param: param.clone(),
                    path: path.to_string(),
                    ancestor: ancestor.path.clone(),
                };
                self.warn(warning);
            }
            if seen.contains(&param.as_str()) {
                self.warn(LoadWarning::RepeatedParam {
                    param: param.clone(),
                    path: path.to_string(),
                });
            }
            seen.push(param);
        }
        declared
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::registry::RouteModule;
    use crate::routing::source::MemorySource;

    fn module() -> RouteModule {
        RouteModule::new().get(|_req, res| Box::pin(async move { Ok(res.send("ok")) }))
    }

    fn registry(keys: &[&str]) -> RouteRegistry {
        keys.iter().fold(RouteRegistry::new(), |r, k| r.with(k, module()))
    }

    fn patterns(table: &RouteTable) -> Vec<&str> {
        table.entries().iter().map(|e| e.pattern()).collect()
    }

    #[test]
    fn test_load_order_and_patterns() {
        let source = MemorySource::new([
            "index.ts",
            "users/[id].ts",
            "users/index.ts",
            "docs/[...slug].ts",
            "blog/[id]-[post].ts",
            "README.md",
        ]);
        let registry = registry(&["index", "users/[id]", "users/index", "docs/[...slug]", "blog/[id]-[post]"]);
        let (table, report) = load_routes(&source, &registry).unwrap();

        assert_eq!(
            patterns(&table),
            vec!["/blog/:id-:post", "/docs/slug*", "/", "/users/:id", "/users"]
        );
        assert_eq!(report.routes, 5);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_unregistered_files_are_skipped() {
        let source = MemorySource::new(["a.ts", "b.ts"]);
        let (table, report) = load_routes(&source, &registry(&["a"])).unwrap();
        assert_eq!(patterns(&table), vec!["/a"]);
        assert_eq!(report.warnings, vec![LoadWarning::Unregistered { file: "b".into() }]);
    }

    #[test]
    fn test_duplicate_patterns_replace_in_place() {
        let source = MemorySource::new(["users.ts", "users/index.ts", "z.ts"]);
        let (table, report) = load_routes(&source, &registry(&["users", "users/index", "z"])).unwrap();
        assert_eq!(patterns(&table), vec!["/users", "/z"]);
        // The `users` directory sorts before `users.ts`, so the file replaces `users/index`.
        assert_eq!(table.entries()[0].file(), "users");
        assert_eq!(
            report.warnings,
            vec![LoadWarning::DuplicatePattern {
                pattern: "/users".into(),
                replaced: "users/index".into(),
                by: "users".into(),
            }]
        );
    }

    #[test]
    fn test_param_conflicts_are_warnings() {
        let source = MemorySource::new(["[id]/posts/[id].ts", "pair/[a]-[a].ts"]);
        let (table, report) = load_routes(&source, &registry(&["[id]/posts/[id]", "pair/[a]-[a]"])).unwrap();
        assert_eq!(table.len(), 2);
        assert!(report.warnings.contains(&LoadWarning::ParamConflict {
            param: "id".into(),
            path: "[id]/posts/[id]".into(),
            ancestor: "[id]".into(),
        }));
        assert!(report.warnings.contains(&LoadWarning::RepeatedParam {
            param: "a".into(),
            path: "pair/[a]-[a]".into(),
        }));
    }

    #[test]
    fn test_sibling_params_do_not_conflict() {
        let source = MemorySource::new(["[org]/a.ts", "[org]/b.ts", "x/[org].ts"]);
        let (_, report) = load_routes(&source, &registry(&["[org]/a", "[org]/b", "x/[org]"])).unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    struct Broken;

    impl RouteSource for Broken {
        fn read_dir(&self, _dir: &str) -> io::Result<Vec<SourceEntry>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn describe(&self) -> String {
            "broken".into()
        }
    }

    #[test]
    fn test_unreadable_root_is_an_error() {
        let err = load_routes(&Broken, &RouteRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
