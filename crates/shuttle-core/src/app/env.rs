//! Environment - ヘッダーから伝播されるプロセス共通の状態
//!
//! `TaskQueue::dispatch` はルーティングの前に必ず `update` を呼びます。
//! ハンドラは現在時刻や replay 状態を引数ではなくここから読みます。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use super::APP_TARGET;
use crate::domain::Headers;
use crate::ports::{Clock, SystemClock};

/// ambient な現在時刻を運ぶヘッダー（RFC 3339）
pub const TICK_TIME_HEADER: &str = "tickTime";
/// replay モードを運ぶヘッダー（"true" / "false"）
pub const REPLAY_HEADER: &str = "replay";

#[derive(Debug, Default)]
struct EnvState {
    tick_time: Option<DateTime<Utc>>,
    replaying: bool,
    headers: Headers,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Environment {
    state: Arc<RwLock<EnvState>>,
    clock: Arc<dyn Clock>,
}

impl Environment {
    /// Clock をフォールバックに使う Environment を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(EnvState::default())),
            clock,
        }
    }

    /// Merges `headers` into the ambient state. Malformed values are ignored.
    pub fn update(&self, headers: &Headers) {
        let mut state = self.state.write();

        if let Some(raw) = headers.get(TICK_TIME_HEADER) {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(time) => state.tick_time = Some(time.with_timezone(&Utc)),
                Err(err) => warn!(
                    target: APP_TARGET,
                    value = %raw,
                    error = %err,
                    "ignoring malformed tickTime header"
                ),
            }
        }

        if let Some(raw) = headers.get(REPLAY_HEADER) {
            match raw.to_ascii_lowercase().as_str() {
                "true" => state.replaying = true,
                "false" => state.replaying = false,
                _ => warn!(target: APP_TARGET, value = %raw, "ignoring malformed replay header"),
            }
        }

        for (key, value) in headers {
            state.headers.insert(key.clone(), value.clone());
        }
    }

    /// Latest propagated tick time, or the clock when none has been seen.
    pub fn now(&self) -> DateTime<Utc> {
        let tick_time = self.state.read().tick_time;
        tick_time.unwrap_or_else(|| self.clock.now())
    }

    /// replay 中かどうか
    pub fn is_replaying(&self) -> bool {
        self.state.read().replaying
    }

    /// 最後に受け取ったヘッダー値
    pub fn header(&self, key: &str) -> Option<String> {
        self.state.read().headers.get(key).cloned()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use rstest::rstest;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn env_at(year: i32) -> Environment {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
        Environment::new(Arc::new(clock))
    }

    #[test]
    fn test_now_falls_back_to_clock_until_a_tick_arrives() {
        let env = env_at(2020);
        assert_eq!(env.now(), Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());

        env.update(&headers(&[(TICK_TIME_HEADER, "2024-06-01T12:00:00+02:00")]));
        assert_eq!(env.now(), Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_malformed_tick_time_keeps_previous_value() {
        let env = env_at(2020);
        env.update(&headers(&[(TICK_TIME_HEADER, "2024-06-01T00:00:00Z")]));
        env.update(&headers(&[(TICK_TIME_HEADER, "soon")]));
        assert_eq!(env.now(), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("false", false)]
    #[case("maybe", false)]
    fn test_replay_header(#[case] raw: &str, #[case] expected: bool) {
        let env = env_at(2020);
        env.update(&headers(&[(REPLAY_HEADER, raw)]));
        assert_eq!(env.is_replaying(), expected);
    }

    #[test]
    fn test_headers_merge_and_clones_share_state() {
        let env = env_at(2020);
        let view = env.clone();
        env.update(&headers(&[("a", "1"), ("b", "2")]));
        env.update(&headers(&[("b", "3")]));

        assert_eq!(view.header("a").as_deref(), Some("1"));
        assert_eq!(view.header("b").as_deref(), Some("3"));
        assert_eq!(view.header("c"), None);
    }
}
