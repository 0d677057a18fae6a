/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Looks `$key` up first. On a miss the future `$block` is awaited, its value
/// is queued for a background write with `$ttl` seconds to live, and returned.
/// Errors from either the lookup or the block are propagated with `?`, so the
/// macro is meant to be the tail expression of a function returning
/// `AppResult<_>`.
///
/// ```rust,ignore
/// async fn rating(&self, id: &str) -> AppResult<Option<String>> {
///     cached!(self.cache, CacheKey::ImdbRating(id.to_string()), 3600, async move {
///         self.fetch_rating(id).await
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
