//! Compile stage tests.
//!
//! The fake-compiler test drives the real process plumbing with a shell
//! script standing in for `solc`. Tests against a real compiler or node are
//! ignored unless run explicitly with the environment they need.

use std::path::{Path, PathBuf};

use contract_deployer::blockchain::Wallet;
use contract_deployer::compiler::{CompilationArtifact, CompilerError};
use contract_deployer::config::DeployConfig;
use contract_deployer::workflow::{Workflow, WorkflowError};

mod common;

fn storage_source() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("contracts/SimpleStorage.sol")
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
fn fake_solc(dir: &Path, name: &str, version: &str, output: &Path) -> PathBuf {
    let path = dir.join(name);
    let input = dir.join(format!("{name}.input.json"));
    write_script(
        &path,
        &format!(
            r#"if [ "$1" = "--version" ]; then
  echo "solc, the solidity compiler commandline interface"
  echo "Version: {version}+commit.26b70077.Linux.g++"
  exit 0
fi
cat > "{input}"
cat "{output}"
"#,
            input = input.display(),
            output = output.display(),
        ),
    );
    path
}

fn compile_config(dir: &Path, solc: PathBuf) -> DeployConfig {
    let mut config = DeployConfig::default();
    config.compiler.source_path = storage_source();
    config.compiler.solc_path = Some(solc);
    config.compiler.artifact_path = dir.join("build/compiled_code.json");
    config
}

// One test function: scripts are written and executed sequentially.
#[cfg(unix)]
#[tokio::test]
async fn test_compile_with_fake_solc() {
    let dir = tempfile::tempdir().unwrap();

    // Successful compilation persists the full output and extracts Storage.
    let solc = fake_solc(dir.path(), "solc-ok", "0.6.0", &common::fixture_path());
    let config = compile_config(dir.path(), solc);
    let workflow = Workflow::new(config.clone());
    let (artifact, contract) = workflow.compile().await.unwrap();

    assert_eq!(contract, common::storage_artifact());
    assert_eq!(artifact.warnings().count(), 1);

    let persisted = CompilationArtifact::load(&config.compiler.artifact_path).unwrap();
    let fixture: serde_json::Value =
        serde_json::from_slice(&std::fs::read(common::fixture_path()).unwrap()).unwrap();
    assert_eq!(persisted.raw(), &fixture);

    let input: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("solc-ok.input.json")).unwrap())
            .unwrap();
    assert_eq!(input["language"], "Solidity");
    assert!(input["sources"]["SimpleStorage.sol"]["content"]
        .as_str()
        .unwrap()
        .contains("contract Storage"));
    assert_eq!(
        input["settings"]["outputSelection"]["*"]["*"],
        serde_json::json!(["abi", "metadata", "evm.bytecode", "evm.sourceMap"])
    );

    // Compiling again overwrites the artifact with identical content.
    let (_, again) = workflow.compile().await.unwrap();
    assert_eq!(again.bytecode, contract.bytecode);
    assert_eq!(again.abi, contract.abi);

    // Wrong release on the path.
    let solc = fake_solc(dir.path(), "solc-new", "0.8.20", &common::fixture_path());
    let err = Workflow::new(compile_config(dir.path(), solc))
        .compile()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Compile(CompilerError::VersionMismatch { .. })
    ));

    // Error diagnostics fail the stage.
    let broken = dir.path().join("broken.json");
    std::fs::write(
        &broken,
        r#"{"errors":[{"severity":"error","type":"ParserError","message":"Expected ';'","formattedMessage":"ParserError: Expected ';'"}],"sources":{}}"#,
    )
    .unwrap();
    let solc = fake_solc(dir.path(), "solc-broken", "0.6.0", &broken);
    let err = Workflow::new(compile_config(dir.path(), solc))
        .compile()
        .await
        .unwrap_err();
    match err {
        WorkflowError::Compile(CompilerError::Compilation(message)) => {
            assert!(message.contains("Expected ';'"))
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Wrong contract name.
    let solc = fake_solc(dir.path(), "solc-other", "0.6.0", &common::fixture_path());
    let mut config = compile_config(dir.path(), solc);
    config.compiler.contract_name = "Missing".to_string();
    let err = Workflow::new(config).compile().await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Compile(CompilerError::MissingContract { .. })
    ));
}

#[tokio::test]
async fn test_missing_compiler_binary() {
    let dir = tempfile::tempdir().unwrap();
    let config = compile_config(dir.path(), dir.path().join("no-such-solc"));

    let err = Workflow::new(config).compile().await.unwrap_err();
    assert_eq!(err.stage(), "compile");
    assert!(matches!(
        err,
        WorkflowError::Compile(CompilerError::ToolchainMissing(_))
    ));
}

#[tokio::test]
#[ignore = "needs DEPLOY_TEST_SOLC pointing at solc 0.6.0"]
async fn test_real_solc_is_deterministic() {
    let solc = std::env::var("DEPLOY_TEST_SOLC").expect("DEPLOY_TEST_SOLC not set");
    let dir = tempfile::tempdir().unwrap();
    let workflow = Workflow::new(compile_config(dir.path(), PathBuf::from(solc)));

    let (_, first) = workflow.compile().await.unwrap();
    let (_, second) = workflow.compile().await.unwrap();
    assert_eq!(first.bytecode, second.bytecode);
    assert_eq!(first.abi, second.abi);
    assert!(first.abi.function("store").is_some());
    assert!(first.abi.function("retrieve").is_some());
}

#[tokio::test]
#[ignore = "needs DEPLOY_TEST_RPC_URL, DEPLOY_TEST_SOLC and a funded PRIVATE_KEY"]
async fn test_full_run_against_real_node() {
    let rpc_url = std::env::var("DEPLOY_TEST_RPC_URL").expect("DEPLOY_TEST_RPC_URL not set");
    let solc = std::env::var("DEPLOY_TEST_SOLC").expect("DEPLOY_TEST_SOLC not set");
    let dir = tempfile::tempdir().unwrap();

    let mut config = compile_config(dir.path(), PathBuf::from(solc));
    config.network.rpc_url = rpc_url;
    let wallet = Wallet::from_env(&config.network.private_key_env, config.network.chain_id).unwrap();
    config.network.sender_address = wallet.address().to_string();

    let report = Workflow::new(config).run(&wallet).await.unwrap();
    assert_eq!(report.interaction.initial, alloy::primitives::U256::ZERO);
    assert_eq!(report.interaction.updated, Some(alloy::primitives::U256::from(7)));
    assert_eq!(report.interaction.write_nonce, report.deployment.nonce + 1);
}
