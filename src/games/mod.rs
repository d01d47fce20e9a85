//! The four game variants.
//!
//! | Variant | Board | Actions |
//! |---|---|---|
//! | [`dig::Dig`] | square grid + bid round | `bidRequest`, `digRequest` |
//! | [`arrows::Arrows`] | linear board + hand of arrow pieces | `pickRequest`, `dropRequest` |
//! | [`counting::Counting`] | four counters | `setMinReward`, `setMaxReward` |
//! | [`trace::Trace`] | flat letter array | none |

pub mod arrows;
pub mod counting;
pub mod dig;
pub mod trace;
