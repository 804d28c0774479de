//! The time fence (§4.7): computed once per Query before fetch launch.

use crate::qparam::QParam;

/// A time-window constraint passed to the backend's `url()` builder.
///
/// `complete=true` requires tuples to lie wholly within `[after, before]`;
/// otherwise tuples need only overlap the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fence {
    pub first_after: Option<u64>,
    pub last_before: Option<u64>,
    pub last_after: Option<u64>,
    pub first_before: Option<u64>,
}

#[must_use]
pub fn compute_fence(params: &QParam) -> Fence {
    if params.complete {
        Fence {
            first_after: params.after,
            last_before: params.before,
            ..Fence::default()
        }
    } else {
        Fence {
            last_after: params.after,
            first_before: params.before,
            ..Fence::default()
        }
    }
}
