// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Feed ranking.

use crate::model::Post;

use chrono::{DateTime, Utc};

/// `karma / (age_in_hours + 2)`. Posts from the future count as brand new.
pub fn score(post: &Post, now: DateTime<Utc>) -> f64 {
    let age_ms = (now - post.created_at).num_milliseconds().max(0);
    let age_hours = age_ms as f64 / 3_600_000.0;
    post.karma() as f64 / (age_hours + 2.0)
}

/// Highest score first, at most `limit` posts. Equal scores keep their input order.
pub fn rank(
    posts: Vec<Post>,
    now: DateTime<Utc>,
    limit: usize,
) -> std::vec::IntoIter<Post> {
    let mut scored: Vec<(f64, Post)> = posts
        .into_iter()
        .map(|post| (score(&post, now), post))
        .collect();
    scored.sort_by(|(left, _), (right, _)| right.total_cmp(left));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(_, post)| post)
        .collect::<Vec<_>>()
        .into_iter()
}
