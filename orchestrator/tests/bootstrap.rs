mod common;

use aces_localnet::{Localnet, LocalnetConfig};
use aces_orchestrator::{Bootstrap, Error};
use aces_table::circuit::CircuitKind;
use common::Harness;

#[tokio::test(start_paused = true)]
async fn test_bootstrap_twice_initializes_once() {
    let harness = Harness::provisioned().await;

    let first = harness.orchestrator.bootstrap(harness.treasury).await.unwrap();
    assert_eq!(first.platform_config, Bootstrap::Created);
    for (_, outcome) in &first.definitions {
        assert_eq!(*outcome, Bootstrap::Created);
    }

    let second = harness.orchestrator.bootstrap(harness.treasury).await.unwrap();
    assert_eq!(second.platform_config, Bootstrap::AlreadyPresent);
    assert_eq!(
        second.definitions,
        CircuitKind::ALL
            .into_iter()
            .map(|circuit| (circuit, Bootstrap::AlreadyPresent))
            .collect::<Vec<_>>()
    );

    for circuit in CircuitKind::ALL {
        assert_eq!(harness.localnet.executed(circuit.init_method()).await, 1);
    }
    assert_eq!(harness.localnet.executed("initialize_platform_config").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_bootstraps_both_succeed() {
    let first = Harness::provisioned().await;
    let payer = first.localnet.new_wallet().await.unwrap();
    let second = Harness::attach(first.localnet.clone(), payer).await;

    let (a, b) = tokio::join!(
        first.orchestrator.bootstrap(first.treasury),
        second.orchestrator.bootstrap(first.treasury),
    );
    a.unwrap();
    b.unwrap();

    for circuit in CircuitKind::ALL {
        assert_eq!(first.localnet.executed(circuit.init_method()).await, 1);
    }
    assert_eq!(first.localnet.executed("initialize_platform_config").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_requires_mxe() {
    common::init_tracing();
    let localnet = Localnet::start(LocalnetConfig::default()).await.unwrap();
    let payer = localnet.new_wallet().await.unwrap();
    let harness = Harness::attach(localnet, payer).await;

    let err = harness
        .orchestrator
        .bootstrap(harness.treasury)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::PrerequisiteMissing {
            what: "MXE account",
            ..
        }
    ));
    for circuit in CircuitKind::ALL {
        assert_eq!(harness.localnet.executed(circuit.init_method()).await, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried() {
    let harness = Harness::provisioned().await;
    harness.localnet.fail_next(2).await;

    harness.orchestrator.bootstrap(harness.treasury).await.unwrap();

    for circuit in CircuitKind::ALL {
        assert_eq!(harness.localnet.executed(circuit.init_method()).await, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_as_unavailable() {
    let harness = Harness::bootstrapped().await;
    harness.localnet.fail_next(100).await;

    let err = harness
        .orchestrator
        .create_table(harness.players[0], harness.mint, common::STAKES)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransientUnavailable { attempts: 5 }));
    assert!(err.is_transient());
    assert_eq!(harness.localnet.executed("create_table").await, 0);
}
