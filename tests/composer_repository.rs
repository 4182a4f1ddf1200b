mod helper;

use std::sync::Arc;

use mockito::Server;
use serde_json::json;

use composer_updates::command::{CheckOptions, build_registries};
use composer_updates::parser::RootManifest;
use composer_updates::version::cache::Cache;
use composer_updates::version::checker::CheckOutcome;
use composer_updates::version::registries::ComposerRegistry;
use composer_updates::version::registry::Registry;

use helper::{TestProject, run_and_capture, table_row};

#[tokio::test]
async fn check_reads_minified_metadata_from_composer_repository() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/p2/monolog/monolog.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "minified": "composer/2.0",
                "packages": {
                    "monolog/monolog": [
                        {"name": "monolog/monolog", "version": "3.5.0", "dist": {"type": "zip", "reference": "c915e2634718"}},
                        {"version": "3.4.0"},
                        {"version": "2.9.2"}
                    ]
                }
            }"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/p2/monolog/monolog~dev.json")
        .with_status(404)
        .create_async()
        .await;

    let project = TestProject::new(json!({
        "require": { "monolog/monolog": "^2.9" }
    }))
    .with_installed(json!({
        "packages": [{ "name": "monolog/monolog", "version": "2.9.1" }]
    }));
    let registry: Arc<dyn Registry> = Arc::new(ComposerRegistry::new(&server.url()));
    let context = project.context(vec![registry], Arc::new(Cache::in_memory().unwrap()));

    let (outcomes, output) = run_and_capture(&context, &CheckOptions::default()).await;

    let CheckOutcome::Resolved(resolved) = &outcomes[0] else {
        panic!("expected resolved outcome");
    };
    assert!(resolved.classification.update_available);
    assert!(resolved.classification.upgrade_available);
    assert!(output.contains(&table_row(
        "monolog/monolog",
        "^2.9",
        "2.9.1",
        "2.9.2",
        "3.5.0"
    )));
}

#[test]
fn manifest_repositories_come_before_packagist() {
    let project = TestProject::new(json!({
        "repositories": [
            { "type": "composer", "url": "https://satis.example.com/" },
            { "type": "vcs", "url": "https://github.com/acme/widget" }
        ],
        "require": {}
    }));
    let manifest = RootManifest::load(&project.path().join("composer.json")).unwrap();

    let urls: Vec<String> = build_registries(&manifest)
        .iter()
        .map(|registry| registry.url())
        .collect();

    assert_eq!(
        urls,
        vec![
            "https://satis.example.com".to_string(),
            "https://repo.packagist.org".to_string(),
        ]
    );
}

#[test]
fn disabled_packagist_is_left_out() {
    let project = TestProject::new(json!({
        "repositories": [{ "packagist.org": false }],
        "require": {}
    }));
    let manifest = RootManifest::load(&project.path().join("composer.json")).unwrap();

    assert!(build_registries(&manifest).is_empty());
}
