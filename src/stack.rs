use std::fmt;
use std::path::{Path, PathBuf};

/// One manifest file inside a stack. `templated` marks files that carry a
/// `${NAMESPACE}` placeholder and must be rendered before apply.
#[derive(Debug, Clone)]
pub struct ManifestRef {
    pub name: &'static str,
    pub path: PathBuf,
    pub templated: bool,
}

/// A named, ordered list of manifests. The order is a correctness contract:
/// later manifests may depend on earlier ones (a Secret must exist before the
/// StatefulSet that mounts it), so it must never be reordered.
#[derive(Debug, Clone)]
pub struct Stack {
    pub name: &'static str,
    pub manifests: Vec<ManifestRef>,
}

/// Target namespace for a single run. Built per invocation, never persisted.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    pub namespace: String,
}

impl NamespaceContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        NamespaceContext {
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.manifests.iter().map(|m| m.name).collect();
        write!(f, "{}: {}", self.name, names.join(" -> "))
    }
}

fn manifest(dir: &Path, stack: &str, name: &'static str) -> ManifestRef {
    ManifestRef {
        name,
        path: dir.join(stack).join(format!("{name}.yaml")),
        templated: true,
    }
}

/// All deployable stacks, rooted at `dir`. The tables below are the ordering
/// contract for each application.
pub fn builtin_stacks(dir: &Path) -> Vec<Stack> {
    vec![
        Stack {
            name: "oncall",
            manifests: vec![
                manifest(dir, "oncall", "config"),
                manifest(dir, "oncall", "vector-config"),
                manifest(dir, "oncall", "deployment"),
                manifest(dir, "oncall", "service"),
                manifest(dir, "oncall", "ingress"),
            ],
        },
        Stack {
            name: "mysql",
            manifests: vec![
                manifest(dir, "mysql", "configmap"),
                manifest(dir, "mysql", "secret"),
                manifest(dir, "mysql", "statefulset"),
                manifest(dir, "mysql", "service"),
            ],
        },
        Stack {
            name: "sla-calculator",
            manifests: vec![
                manifest(dir, "sla-calculator", "configmap"),
                manifest(dir, "sla-calculator", "secret"),
                manifest(dir, "sla-calculator", "deployment"),
            ],
        },
        Stack {
            name: "prober",
            manifests: vec![
                manifest(dir, "prober", "deployment"),
                manifest(dir, "prober", "service"),
            ],
        },
    ]
}

pub fn find_stack(dir: &Path, name: &str) -> Option<Stack> {
    builtin_stacks(dir).into_iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oncall_stack_order_is_fixed() {
        let stack = find_stack(Path::new("manifests"), "oncall").unwrap();
        let names: Vec<&str> = stack.manifests.iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            ["config", "vector-config", "deployment", "service", "ingress"]
        );
        assert!(stack.manifests.iter().all(|m| m.templated));
    }

    #[test]
    fn mysql_secret_precedes_statefulset() {
        let stack = find_stack(Path::new("manifests"), "mysql").unwrap();
        let names: Vec<&str> = stack.manifests.iter().map(|m| m.name).collect();
        let secret = names.iter().position(|n| *n == "secret").unwrap();
        let sts = names.iter().position(|n| *n == "statefulset").unwrap();
        assert!(secret < sts);
    }

    #[test]
    fn unknown_stack_is_none() {
        assert!(find_stack(Path::new("manifests"), "nope").is_none());
    }

    fn shipped_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("manifests")
    }

    #[test]
    fn shipped_templates_render_to_namespaced_yaml() {
        for stack in builtin_stacks(&shipped_dir()) {
            for m in &stack.manifests {
                let raw = std::fs::read_to_string(&m.path).unwrap();
                let rendered = crate::template::render(&m.path, &raw, "st-ab1-kim").unwrap();
                let value: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
                assert_eq!(
                    value["metadata"]["namespace"],
                    serde_yaml::Value::String("st-ab1-kim".into()),
                    "{} should be scoped to the rendered namespace",
                    m.name
                );
            }
        }
    }

    #[test]
    fn oncall_config_renders_to_a_configmap() {
        use k8s_openapi::api::core::v1::ConfigMap;

        let stack = find_stack(&shipped_dir(), "oncall").unwrap();
        let config = &stack.manifests[0];
        let raw = std::fs::read_to_string(&config.path).unwrap();
        let rendered = crate::template::render(&config.path, &raw, "st-ab1-kim").unwrap();

        let cm: ConfigMap = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(cm.metadata.name.as_deref(), Some("oncall-config"));
        assert!(cm.data.unwrap().contains_key("config.yml"));
    }

    #[test]
    fn manifest_paths_are_rooted_at_dir() {
        let stack = find_stack(Path::new("/srv/deploy"), "prober").unwrap();
        assert_eq!(
            stack.manifests[0].path,
            Path::new("/srv/deploy/prober/deployment.yaml")
        );
    }
}
