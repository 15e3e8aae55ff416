#![no_main]

use libfuzzer_sys::fuzz_target;
use matchday_client::protocol::ServerMessage;
use matchday_client::registry::{transition, Change, Context};
use matchday_client::DrawPolicy;

// Feed a newline-separated stream of server frames through the Room State
// transition function under every draw policy.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let frames: Vec<ServerMessage> = text
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    for draw_policy in [
        DrawPolicy::FollowServer,
        DrawPolicy::ReturnToLobby,
        DrawPolicy::ContinueInPlace,
    ] {
        let mut room = None;
        let mut result = None;
        for (i, frame) in frames.iter().enumerate() {
            let ctx = Context {
                awaiting_room: i == 0,
                draw_policy,
                result: result.clone(),
            };
            let step = transition(room.as_ref(), frame, &ctx);
            match step.room {
                Change::Keep => {}
                Change::Set(next) => room = Some(next),
                Change::Clear => room = None,
            }
            match step.result {
                Change::Keep => {}
                Change::Set(next) => result = Some(next),
                Change::Clear => result = None,
            }
        }
    }
});
