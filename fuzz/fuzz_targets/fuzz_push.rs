#![no_main]

use libfuzzer_sys::fuzz_target;
use parlor_client::games::dig::Dig;
use parlor_client::protocol::Frame;
use parlor_client::state::session_router;
use parlor_client::{view, ClientState};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(frame) = Frame::from_json(text) else {
        return;
    };

    // Any push, well-formed or not, must leave a renderable state behind.
    let router = session_router::<Dig>();
    let mut state = ClientState::<Dig>::default();
    let _ = state.apply(&router, &frame);
    let _ = view::render(&state);
});
