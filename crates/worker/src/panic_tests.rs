use std::time::Duration;

use super::{TaskClass, join_error_panic_message, spawn};

#[tokio::test]
async fn extracts_static_str_payload() {
	let handle = spawn(TaskClass::Assembly, async { panic!("unstable isotope") });
	let err = handle.await.unwrap_err();
	let msg = join_error_panic_message(err).expect("should be a panic");
	assert!(msg.contains("unstable isotope"), "expected 'unstable isotope', got: {msg}");
}

#[tokio::test]
async fn extracts_string_payload() {
	let handle = spawn(TaskClass::Background, async { panic!("{}", String::from("lone oxygen")) });
	let err = handle.await.unwrap_err();
	let msg = join_error_panic_message(err).expect("should be a panic");
	assert!(msg.contains("lone oxygen"), "expected 'lone oxygen', got: {msg}");
}

#[tokio::test]
async fn returns_none_for_cancellation() {
	let handle = spawn(TaskClass::Assembly, async {
		tokio::time::sleep(Duration::from_secs(60)).await;
	});
	handle.abort();
	let err = handle.await.unwrap_err();
	assert!(join_error_panic_message(err).is_none(), "cancelled task should return None");
}
