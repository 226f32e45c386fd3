use std::path::Path;

use crate::error::DeployError;

const PLACEHOLDER: &str = "${NAMESPACE}";

/// Substitutes the namespace into a manifest template, envsubst style.
/// The namespace must be non-empty and every `${NAMESPACE}` occurrence must be
/// resolved; both checks fail before anything touches the network.
pub fn render(path: &Path, text: &str, namespace: &str) -> Result<String, DeployError> {
    if namespace.trim().is_empty() {
        return Err(DeployError::Templating {
            path: path.to_owned(),
            detail: "namespace value is empty".to_owned(),
        });
    }

    if !text.contains(PLACEHOLDER) {
        return Err(DeployError::Templating {
            path: path.to_owned(),
            detail: format!("no {PLACEHOLDER} placeholder in templated manifest"),
        });
    }

    Ok(text.replace(PLACEHOLDER, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_every_occurrence() {
        let text = "metadata:\n  name: oncall\n  namespace: ${NAMESPACE}\nlabels:\n  ns: ${NAMESPACE}\n";
        let out = render(Path::new("x.yaml"), text, "st-ab1-kim").unwrap();
        assert!(!out.contains("${NAMESPACE}"));
        assert_eq!(out.matches("st-ab1-kim").count(), 2);
    }

    #[test]
    fn empty_namespace_is_fatal() {
        let err = render(Path::new("x.yaml"), "namespace: ${NAMESPACE}", "").unwrap_err();
        assert!(matches!(err, DeployError::Templating { .. }));
    }

    #[test]
    fn template_without_placeholder_is_fatal() {
        let err = render(Path::new("x.yaml"), "namespace: fixed", "dev").unwrap_err();
        assert!(matches!(err, DeployError::Templating { .. }));
    }
}
