use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::{discovery, Client};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::DeployError;
use crate::stack::{NamespaceContext, Stack};
use crate::template;

/// Field manager for server-side apply. Re-applying unchanged manifests under
/// the same manager is a no-op in the cluster.
const FIELD_MANAGER: &str = "oncall-deploy";

const APPLY_TIMEOUT_SECS: u64 = 30;

/// Submits one rendered manifest to the cluster. A trait seam so the ordering
/// and fail-fast contracts can be tested without a live apiserver.
#[async_trait]
pub trait ManifestSink {
    async fn submit(
        &mut self,
        manifest: &str,
        namespace: &str,
        rendered: &str,
    ) -> Result<(), DeployError>;
}

/// Runs one stack against one namespace: render, then submit, strictly in
/// declared order, stopping at the first failure. Nothing applied so far is
/// rolled back.
pub async fn run_stack(
    sink: &mut dyn ManifestSink,
    stack: &Stack,
    ctx: &NamespaceContext,
) -> Result<(), DeployError> {
    for m in &stack.manifests {
        let raw = std::fs::read_to_string(&m.path).map_err(|e| DeployError::ReadManifest {
            path: m.path.clone(),
            source: e,
        })?;

        let rendered = if m.templated {
            template::render(&m.path, &raw, &ctx.namespace)?
        } else {
            raw
        };

        info!(manifest = m.name, namespace = %ctx.namespace, "applying");
        sink.submit(m.name, &ctx.namespace, &rendered).await?;
    }

    Ok(())
}

/// Runs one stack against each namespace in turn. Each namespace is an
/// independent fail-fast run; a failure in one does not stop the attempt
/// against the next. Returns the errors of every failed run.
pub async fn run_namespaces(
    sink: &mut dyn ManifestSink,
    stack: &Stack,
    namespaces: &[String],
) -> Vec<DeployError> {
    let mut failures = Vec::new();

    for ns in namespaces {
        let ctx = NamespaceContext::new(ns.clone());
        match run_stack(sink, stack, &ctx).await {
            Ok(()) => info!(stack = stack.name, namespace = %ns, "stack applied"),
            Err(e) => {
                warn!(stack = stack.name, namespace = %ns, error = %e, "stack failed");
                failures.push(e);
            }
        }
    }

    failures
}

/// The production sink: parses rendered YAML into dynamic objects and
/// server-side-applies each one, scoped to the target namespace.
pub struct KubeApplier {
    client: Client,
}

impl KubeApplier {
    pub async fn connect() -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        Ok(KubeApplier { client })
    }

    async fn apply_object(
        &self,
        manifest: &str,
        namespace: &str,
        obj: DynamicObject,
    ) -> Result<(), DeployError> {
        let types = obj.types.clone().ok_or_else(|| DeployError::Apply {
            manifest: manifest.to_owned(),
            namespace: namespace.to_owned(),
            detail: "document has no apiVersion/kind".to_owned(),
        })?;
        let gvk = GroupVersionKind::try_from(&types).map_err(|e| DeployError::Apply {
            manifest: manifest.to_owned(),
            namespace: namespace.to_owned(),
            detail: e.to_string(),
        })?;

        let (ar, _caps) = discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| DeployError::apply(manifest, namespace, e))?;

        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let name = obj.metadata.name.clone().ok_or_else(|| DeployError::Apply {
            manifest: manifest.to_owned(),
            namespace: namespace.to_owned(),
            detail: format!("{} document has no metadata.name", gvk.kind),
        })?;

        let params = PatchParams::apply(FIELD_MANAGER).force();
        // The patch body must outlive the future awaited under the timeout.
        let body = Patch::Apply(&obj);
        let patch = api.patch(&name, &params, &body);

        match tokio::time::timeout(Duration::from_secs(APPLY_TIMEOUT_SECS), patch).await {
            Ok(Ok(applied)) => {
                info!(
                    kind = %gvk.kind,
                    name = %name,
                    namespace = %namespace,
                    resource_version = applied.metadata.resource_version.as_deref().unwrap_or(""),
                    "applied"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(DeployError::apply(manifest, namespace, e)),
            Err(_) => Err(DeployError::ApplyTimeout {
                manifest: manifest.to_owned(),
                namespace: namespace.to_owned(),
                seconds: APPLY_TIMEOUT_SECS,
            }),
        }
    }
}

/// Splits a rendered manifest into its `---` separated documents, in file
/// order. The yaml deserializer is not `Send`, so all parsing happens here,
/// before any apply is awaited.
fn parse_documents(manifest: &str, rendered: &str) -> Result<Vec<DynamicObject>, DeployError> {
    let mut docs = Vec::new();

    for doc in serde_yaml::Deserializer::from_str(rendered) {
        let value = serde_yaml::Value::deserialize(doc).map_err(|e| DeployError::ParseManifest {
            manifest: manifest.to_owned(),
            source: e,
        })?;
        if value.is_null() {
            continue;
        }
        let obj: DynamicObject =
            serde_yaml::from_value(value).map_err(|e| DeployError::ParseManifest {
                manifest: manifest.to_owned(),
                source: e,
            })?;
        docs.push(obj);
    }

    Ok(docs)
}

#[async_trait]
impl ManifestSink for KubeApplier {
    async fn submit(
        &mut self,
        manifest: &str,
        namespace: &str,
        rendered: &str,
    ) -> Result<(), DeployError> {
        for obj in parse_documents(manifest, rendered)? {
            self.apply_object(manifest, namespace, obj).await?;
        }

        Ok(())
    }
}
