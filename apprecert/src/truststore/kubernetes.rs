//! A CA bundle ConfigMap in the current kubectl context.

use super::{
    Change, Discovery, Location, TargetKind, ToolCommand, ToolOutput, TrustEnv, TrustError,
    TrustTarget,
};

const NAMESPACE: &str = "kube-system";
const CONFIG_MAP: &str = "custom-ca-bundle";
const KUBEADM_CONFIG: &str = "kubeadm-config";
const CERTIFICATES_DIR_PATCH: &str = r#"[{"op": "add", "path": "/data/ClusterConfiguration/certificatesDir", "value": "/etc/kubernetes/pki/custom-ca-bundle"}]"#;

pub struct KubernetesConfigMap;

fn kubectl<'a>(args: impl IntoIterator<Item = &'a str>) -> ToolCommand {
    ToolCommand::new("kubectl", args)
}

/// The server reported the configmap itself as missing. Client-side errors
/// such as an unknown context also say "not found" and must not match.
fn not_found(output: &ToolOutput) -> bool {
    output.mentions("(NotFound)")
        || output.mentions(&format!("configmaps \"{CONFIG_MAP}\" not found"))
}

fn get_config_map() -> ToolCommand {
    kubectl(["get", "configmap", CONFIG_MAP, "-n", NAMESPACE])
}

fn config_map_label() -> String {
    format!("configmap {NAMESPACE}/{CONFIG_MAP}")
}

impl TrustTarget for KubernetesConfigMap {
    fn kind(&self) -> TargetKind {
        TargetKind::Kubernetes
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if env.runner.find_program("kubectl").is_none() {
            return Discovery::skip("kubectl not found on PATH");
        }

        match env.runner.run(&get_config_map()) {
            Ok(output) if output.success() || not_found(&output) => {
                Discovery::Found(vec![Location::named(config_map_label())])
            }
            Ok(output) => {
                let detail = output.combined();
                let first_line = detail.lines().next().unwrap_or("no output").trim();
                Discovery::skip(format!("cluster unreachable: {first_line}"))
            }
            Err(e) => Discovery::skip(format!("cluster unreachable: {e}")),
        }
    }

    fn install(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;

        let existing = env.runner.run(&get_config_map())?;
        if existing.success() {
            // An existing bundle may hold other CAs; it is never overwritten.
            return Err(TrustError::AlreadyExists(config_map_label()));
        }
        if !not_found(&existing) {
            return Err(existing.into_failure(&get_config_map()));
        }

        let from_file = format!("--from-file=ca.crt={}", env.ca.path.display());
        env.run_checked(&kubectl([
            "create",
            "configmap",
            CONFIG_MAP,
            "-n",
            NAMESPACE,
            from_file.as_str(),
        ]))?;
        env.run_checked(&kubectl([
            "patch",
            "configmap",
            KUBEADM_CONFIG,
            "-n",
            NAMESPACE,
            "--type",
            "json",
            "-p",
            CERTIFICATES_DIR_PATCH,
        ]))?;

        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.run_removal(
            &kubectl(["delete", "configmap", CONFIG_MAP, "-n", NAMESPACE]),
            not_found,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truststore::testing::{ScriptedRunner, ca_file, env};
    use tempfile::TempDir;

    const NOT_FOUND: &str =
        "Error from server (NotFound): configmaps \"custom-ca-bundle\" not found";

    fn location() -> Location {
        Location::named(config_map_label())
    }

    #[test]
    fn install_with_existing_config_map_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new().respond(
            "get configmap",
            0,
            "NAME               DATA   AGE\ncustom-ca-bundle   1      3d",
            "",
        );

        let err = KubernetesConfigMap
            .install(&env(&runner, &ca), &location())
            .unwrap_err();
        assert!(matches!(err, TrustError::AlreadyExists(_)));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls.iter().all(|c| {
            !c.contains(" create ") && !c.contains(" patch ") && !c.contains(" delete ")
        }));
    }

    #[test]
    fn install_creates_and_patches_when_absent() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new().respond("get configmap", 1, "", NOT_FOUND);

        let change = KubernetesConfigMap
            .install(&env(&runner, &ca), &location())
            .unwrap();
        assert_eq!(change, Change::Applied);

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            format!(
                "kubectl create configmap custom-ca-bundle -n kube-system --from-file=ca.crt={}",
                ca.path.display()
            )
        );
        assert_eq!(
            calls[2],
            format!("kubectl patch configmap kubeadm-config -n kube-system --type json -p {CERTIFICATES_DIR_PATCH}")
        );
    }

    #[test]
    fn unreachable_cluster_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new().with_program("kubectl").respond(
            "get configmap",
            1,
            "",
            "The connection to the server localhost:8080 was refused - did you specify the right host or port?",
        );

        let Discovery::Skip(reason) = KubernetesConfigMap.discover(&env(&runner, &ca)) else {
            panic!("expected skip");
        };
        assert!(reason.starts_with("cluster unreachable"), "{reason}");
    }

    #[test]
    fn missing_kube_context_is_not_an_absent_config_map() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new().with_program("kubectl").respond(
            "get configmap",
            1,
            "",
            "error: context \"staging\" not found",
        );

        assert!(matches!(
            KubernetesConfigMap.discover(&env(&runner, &ca)),
            Discovery::Skip(_)
        ));

        let err = KubernetesConfigMap
            .install(&env(&runner, &ca), &location())
            .unwrap_err();
        assert!(matches!(err, TrustError::ToolFailed { .. }), "{err}");
        assert!(runner.calls().iter().all(|c| !c.contains(" create ")));
    }

    #[test]
    fn timed_out_cluster_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new()
            .with_program("kubectl")
            .time_out("get configmap");

        assert!(matches!(
            KubernetesConfigMap.discover(&env(&runner, &ca)),
            Discovery::Skip(_)
        ));
    }

    #[test]
    fn absent_config_map_is_discovered() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new()
            .with_program("kubectl")
            .respond("get configmap", 1, "", NOT_FOUND);

        assert_eq!(
            KubernetesConfigMap.discover(&env(&runner, &ca)),
            Discovery::Found(vec![location()])
        );
    }

    #[test]
    fn uninstall_of_missing_config_map_succeeds() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new().respond("delete configmap", 1, "", NOT_FOUND);

        let change = KubernetesConfigMap
            .uninstall(&env(&runner, &ca), &location())
            .unwrap();
        assert_eq!(change, Change::NotPresent);
    }
}
