#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Exercise the raw-byte deserialization path (includes serde_json's
    // own UTF-8 validation and error handling for invalid sequences).
    let _ = serde_json::from_slice::<matchday_client::protocol::ServerMessage>(data);

    // Decoded frames must re-encode under the same event name.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(msg) = serde_json::from_str::<matchday_client::protocol::ServerMessage>(s) {
            if let Ok(value) = serde_json::to_value(&msg) {
                assert_eq!(value["event"], msg.kind().as_str());
            }
        }
    }
});
