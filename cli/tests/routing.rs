use anyhow::Result;
use pretty_assertions::assert_eq;
use switchboard_cli::build_dispatcher;
use switchboard_core::Status;

#[tokio::test(flavor = "multi_thread")]
async fn deeply_nested_arithmetic_is_an_error_not_a_crash() -> Result<()> {
    let dispatcher = build_dispatcher(None).await?;

    for text in [
        format!("calc {}1", "(".repeat(200_000)),
        format!("calc {}1", "-".repeat(200_000)),
    ] {
        let result = dispatcher.smart_route(&text).await;
        assert_eq!(result.status(), Status::Error);
        assert!(
            result.error_message().ends_with("expression nested too deeply"),
            "unexpected error: {}",
            result.error_message()
        );
    }

    // The process and the registry keep serving afterwards.
    let result = dispatcher.smart_route("calc (1 + 2) * 3").await;
    assert_eq!(result.report(), "(1 + 2) * 3 = 9");
    assert_eq!(dispatcher.execution_history(10).len(), 3);
    Ok(())
}
