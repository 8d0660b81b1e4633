mod common;

use common::{LogCapture, MockTransport, config};
use hpx_reconnect::{Supervisor, SupervisorEvent};
use tracing_subscriber::EnvFilter;

#[tokio::test(start_paused = true)]
async fn test_lifecycle_is_logged() {
    let capture = LogCapture::default();
    let _guard = capture.install(EnvFilter::new("hpx_reconnect=debug"));

    let (transport, mut sessions) = MockTransport::new();
    let (handle, mut events) = Supervisor::connect(config(), transport)
        .await
        .expect("supervisor should start");
    assert_eq!(events.next().await, Some(SupervisorEvent::Connecting));

    let first = sessions.next().await.expect("first session");
    handle.send("dropped").await;
    first.fail("connection refused");
    assert_eq!(
        events.next().await,
        Some(SupervisorEvent::Error("connection refused".into()))
    );
    assert_eq!(events.next().await, Some(SupervisorEvent::Connecting));

    let second = sessions.next().await.expect("reconnect session");
    second.open();
    assert_eq!(events.next().await, Some(SupervisorEvent::Open));
    handle.close().await;
    assert_eq!(events.next().await, Some(SupervisorEvent::Close));
    assert_eq!(events.next().await, None);

    let logs = capture.output();
    for expected in [
        "Connection supervisor created",
        "Connection is not open; dropping outbound message",
        "Reconnecting",
        "Reconnect attempt",
        "Connection open",
        "Closing connection",
        "Connection supervisor stopped",
    ] {
        assert!(logs.contains(expected), "missing {expected:?} in:\n{logs}");
    }
    assert!(logs.contains("ERROR"), "send while connecting logs an error:\n{logs}");
    assert!(logs.contains("WARN"), "reconnect attempts log a warning:\n{logs}");
}
