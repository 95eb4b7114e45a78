use redis::RedisResult;
use uuid::Uuid;

/// Distributed lock over Redis, one key per event. The stored value is an
/// owner token so only the task that acquired a lock can release it; the
/// TTL bounds how long a crashed holder can block an event.
#[derive(Clone)]
pub struct LockClient {
    client: redis::Client,
}

/// Key guarding reservation attempts against one event.
pub fn event_booking_lock_key(event_id: Uuid) -> String {
    format!("event_booking_lock:{}", event_id)
}

impl LockClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Try to take the lock. Returns the owner token on success, None when
    /// another holder is active. Atomic single round trip: SET NX EX.
    pub async fn acquire(&self, key: &str, ttl_seconds: u64) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token = Uuid::new_v4().to_string();

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.map(|_| token))
    }

    /// Release by token. Compare-and-delete runs as a Lua script so a
    /// stale holder whose TTL already lapsed can never delete the lock a
    /// newer owner holds.
    pub async fn release(&self, key: &str, token: &str) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let removed: i64 = script.key(key).arg(token).invoke_async(&mut conn).await?;
        Ok(removed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_scoped_per_event() {
        let event_id = Uuid::new_v4();
        assert_eq!(
            event_booking_lock_key(event_id),
            format!("event_booking_lock:{}", event_id)
        );
    }
}
