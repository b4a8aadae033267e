//! Resolves the USD→KRW rate used for an expense date.
//!
//! Precedence: manual override, then cached rate, then the remote provider.
//! When the provider fails the resolver returns
//! [`RateResolution::NeedsManualInput`] and lets the caller collect a rate.

use crate::core::cache::KeyValueCollection;
use crate::core::rate::{
    CurrencyRateProvider, ExchangeRate, RateResolution, RateSource, ResolvedRate, parse_rate,
};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const BASE_CURRENCY: &str = "USD";
pub const TARGET_CURRENCY: &str = "KRW";

const RATE_PREFIX: &str = "rate-";
const OVERRIDE_PREFIX: &str = "rate-override-";

fn cache_key(date: NaiveDate) -> String {
    format!("{RATE_PREFIX}{date}")
}

fn override_key(date: NaiveDate) -> String {
    format!("{OVERRIDE_PREFIX}{date}")
}

pub struct RateResolver {
    collection: Arc<dyn KeyValueCollection>,
    provider: Arc<dyn CurrencyRateProvider>,
    fallback_rate: Decimal,
    today: fn() -> NaiveDate,
}

impl RateResolver {
    pub fn new(
        collection: Arc<dyn KeyValueCollection>,
        provider: Arc<dyn CurrencyRateProvider>,
        fallback_rate: Decimal,
    ) -> Self {
        Self {
            collection,
            provider,
            fallback_rate,
            today: || Local::now().date_naive(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    async fn stored_rate(&self, key: &str) -> Option<Decimal> {
        let bytes = self.collection.get(key.as_bytes()).await?;
        let text = String::from_utf8_lossy(&bytes);
        let rate = parse_rate(&text);
        if rate.is_none() {
            warn!("Ignoring unreadable rate under {}: '{}'", key, text);
        }
        rate
    }

    pub async fn rate_for(&self, date: NaiveDate) -> RateResolution {
        if let Some(rate) = self.stored_rate(&override_key(date)).await {
            debug!("Using manual rate {} for {}", rate, date);
            return RateResolution::Resolved(ResolvedRate {
                rate,
                source: RateSource::Manual,
            });
        }

        if let Some(rate) = self.stored_rate(&cache_key(date)).await {
            debug!("Using cached rate {} for {}", rate, date);
            return RateResolution::Resolved(ResolvedRate {
                rate,
                source: RateSource::Cached,
            });
        }

        match self.provider.get_rate(BASE_CURRENCY, TARGET_CURRENCY).await {
            Ok(rate) => {
                // The provider only knows the latest rate; pinning it to a past
                // date would misstate that day's rate for good.
                if date >= (self.today)() {
                    let key = cache_key(date);
                    if let Err(e) = self
                        .collection
                        .put(key.as_bytes(), rate.to_string().as_bytes())
                        .await
                    {
                        warn!("Failed to cache rate for {}: {:#}", date, e);
                    }
                } else {
                    debug!("Not caching latest rate {} under past date {}", rate, date);
                }
                RateResolution::Resolved(ResolvedRate {
                    rate,
                    source: RateSource::Fetched,
                })
            }
            Err(e) => {
                warn!("Failed to fetch exchange rate for {}: {:#}", date, e);
                RateResolution::NeedsManualInput {
                    date,
                    fallback: self.fallback_rate,
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    /// Applies the user's answer to a manual rate request. A valid positive
    /// number is stored as the override for `date`; anything else yields the
    /// fallback rate and stores nothing.
    pub async fn accept_manual_input(
        &self,
        date: NaiveDate,
        input: Option<&str>,
    ) -> Result<ResolvedRate> {
        match input.and_then(parse_rate) {
            Some(rate) => {
                self.set_manual_rate(date, rate).await?;
                Ok(ResolvedRate {
                    rate,
                    source: RateSource::Manual,
                })
            }
            None => {
                info!("No manual rate given for {}, using fallback", date);
                Ok(ResolvedRate {
                    rate: self.fallback_rate,
                    source: RateSource::Fallback,
                })
            }
        }
    }

    /// Resolves a rate, asking `prompt` for a manual value when the remote
    /// source is unavailable. `prompt` receives the date, the fallback rate and
    /// the failure reason and returns the raw user input, if any.
    pub async fn resolve_with<F>(&self, date: NaiveDate, prompt: F) -> Result<ResolvedRate>
    where
        F: FnOnce(NaiveDate, Decimal, &str) -> Option<String>,
    {
        match self.rate_for(date).await {
            RateResolution::Resolved(resolved) => Ok(resolved),
            RateResolution::NeedsManualInput {
                date,
                fallback,
                reason,
            } => {
                let input = prompt(date, fallback, &reason);
                self.accept_manual_input(date, input.as_deref()).await
            }
        }
    }

    pub async fn set_manual_rate(&self, date: NaiveDate, rate: Decimal) -> Result<()> {
        self.collection
            .put(override_key(date).as_bytes(), rate.to_string().as_bytes())
            .await
            .with_context(|| format!("Failed to store manual rate for {date}"))?;
        info!("Stored manual rate {} for {}", rate, date);
        Ok(())
    }

    /// Lists every stored rate, ordered by date with cached entries before
    /// manual ones.
    pub async fn list_stored_rates(&self) -> Result<Vec<ExchangeRate>> {
        let entries = self
            .collection
            .scan_prefix(RATE_PREFIX.as_bytes())
            .await
            .context("Failed to scan stored rates")?;

        let mut rates: Vec<ExchangeRate> = entries
            .into_iter()
            .filter_map(|(key, value)| {
                let key = String::from_utf8(key).ok()?;
                let (date, is_manual) = match key.strip_prefix(OVERRIDE_PREFIX) {
                    Some(date) => (date.to_string(), true),
                    None => (key.strip_prefix(RATE_PREFIX)?.to_string(), false),
                };
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
                let rate = parse_rate(&String::from_utf8_lossy(&value))?;
                Some(ExchangeRate {
                    date,
                    rate,
                    is_manual,
                })
            })
            .collect();

        rates.sort_by_key(|r| (r.date, r.is_manual));
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        rate: Option<Decimal>,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn ok(rate: Decimal) -> Arc<Self> {
            Arc::new(Self {
                rate: Some(rate),
                call_count: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                rate: None,
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for MockProvider {
        async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            assert_eq!((from, to), ("USD", "KRW"));
            self.rate.ok_or_else(|| anyhow!("network unreachable"))
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn resolver(provider: Arc<MockProvider>) -> (RateResolver, Arc<MemoryCollection>) {
        let collection = Arc::new(MemoryCollection::new());
        let resolver = RateResolver::new(collection.clone(), provider, dec!(1300))
            .with_today(fixed_today);
        (resolver, collection)
    }

    fn resolved(rate: Decimal, source: RateSource) -> RateResolution {
        RateResolution::Resolved(ResolvedRate { rate, source })
    }

    #[tokio::test]
    async fn test_fetch_caches_rate_for_today() {
        let provider = MockProvider::ok(dec!(1342.5));
        let (resolver, collection) = resolver(provider.clone());
        let today = fixed_today();

        assert_eq!(
            resolver.rate_for(today).await,
            resolved(dec!(1342.5), RateSource::Fetched)
        );
        assert_eq!(
            collection.get(b"rate-2024-03-01").await,
            Some(b"1342.5".to_vec())
        );

        assert_eq!(
            resolver.rate_for(today).await,
            resolved(dec!(1342.5), RateSource::Cached)
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_does_not_cache_past_dates() {
        let provider = MockProvider::ok(dec!(1342.5));
        let (resolver, collection) = resolver(provider.clone());

        assert_eq!(
            resolver.rate_for(date("2023-12-24")).await,
            resolved(dec!(1342.5), RateSource::Fetched)
        );
        assert!(collection.get(b"rate-2023-12-24").await.is_none());
    }

    #[tokio::test]
    async fn test_override_takes_precedence_over_cache() {
        let provider = MockProvider::ok(dec!(1342.5));
        let (resolver, collection) = resolver(provider.clone());
        let d = date("2024-02-10");
        collection.put(b"rate-2024-02-10", b"1320").await.unwrap();

        assert_eq!(
            resolver.rate_for(d).await,
            resolved(dec!(1320), RateSource::Cached)
        );

        resolver.set_manual_rate(d, dec!(1333.33)).await.unwrap();
        assert_eq!(
            resolver.rate_for(d).await,
            resolved(dec!(1333.33), RateSource::Manual)
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_stored_rate_is_skipped() {
        let provider = MockProvider::ok(dec!(1350));
        let (resolver, collection) = resolver(provider.clone());
        collection.put(b"rate-override-2024-03-01", b"oops").await.unwrap();

        assert_eq!(
            resolver.rate_for(fixed_today()).await,
            resolved(dec!(1350), RateSource::Fetched)
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_needs_manual_input() {
        let provider = MockProvider::failing();
        let (resolver, collection) = resolver(provider);
        let d = fixed_today();

        match resolver.rate_for(d).await {
            RateResolution::NeedsManualInput {
                date,
                fallback,
                reason,
            } => {
                assert_eq!(date, d);
                assert_eq!(fallback, dec!(1300));
                assert!(reason.contains("network unreachable"));
            }
            other => panic!("Expected manual input request, got {other:?}"),
        }
        assert!(collection.scan_prefix(b"rate-").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_manual_input_persists_override() {
        let provider = MockProvider::failing();
        let (resolver, _) = resolver(provider.clone());
        let d = fixed_today();

        let rate = resolver
            .accept_manual_input(d, Some(" 1288.1 "))
            .await
            .unwrap();
        assert_eq!(rate.rate, dec!(1288.1));
        assert_eq!(rate.source, RateSource::Manual);

        assert_eq!(
            resolver.rate_for(d).await,
            resolved(dec!(1288.1), RateSource::Manual)
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_declined_manual_input_uses_fallback() {
        let provider = MockProvider::failing();
        let (resolver, collection) = resolver(provider);
        let d = fixed_today();

        for input in [None, Some(""), Some("abc"), Some("-1")] {
            let rate = resolver.accept_manual_input(d, input).await.unwrap();
            assert_eq!(rate.rate, dec!(1300));
            assert_eq!(rate.source, RateSource::Fallback);
        }
        assert!(collection.scan_prefix(b"rate-").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_with_only_prompts_on_failure() {
        let (ok_resolver, _) = resolver(MockProvider::ok(dec!(1310)));
        let rate = ok_resolver
            .resolve_with(fixed_today(), |_, _, _| panic!("should not prompt"))
            .await
            .unwrap();
        assert_eq!(rate.rate, dec!(1310));

        let (failing_resolver, _) = resolver(MockProvider::failing());
        let rate = failing_resolver
            .resolve_with(fixed_today(), |date, fallback, _| {
                assert_eq!(date, fixed_today());
                assert_eq!(fallback, dec!(1300));
                Some("1299".to_string())
            })
            .await
            .unwrap();
        assert_eq!(rate.rate, dec!(1299));
        assert_eq!(rate.source, RateSource::Manual);
    }

    #[tokio::test]
    async fn test_list_stored_rates() {
        let provider = MockProvider::ok(dec!(1342.5));
        let (resolver, collection) = resolver(provider);

        collection.put(b"rate-2024-03-02", b"1350").await.unwrap();
        collection.put(b"rate-2024-03-01", b"1340").await.unwrap();
        collection.put(b"rate-override-2024-03-01", b"1345").await.unwrap();
        collection.put(b"rate-garbage", b"1").await.unwrap();
        collection.put(b"expenses-v1", b"[]").await.unwrap();

        let rates = resolver.list_stored_rates().await.unwrap();
        assert_eq!(
            rates,
            vec![
                ExchangeRate {
                    date: date("2024-03-01"),
                    rate: dec!(1340),
                    is_manual: false,
                },
                ExchangeRate {
                    date: date("2024-03-01"),
                    rate: dec!(1345),
                    is_manual: true,
                },
                ExchangeRate {
                    date: date("2024-03-02"),
                    rate: dec!(1350),
                    is_manual: false,
                },
            ]
        );
    }
}
