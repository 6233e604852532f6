// Price oracle
//
// Round-based feeds in the style of the on-chain aggregators: every update opens a new
// round carrying an integer answer scaled by the feed's decimals. Consumers go through
// the PriceOracle trait, which validates the round before handing out a price. There is
// no fallback to a last-good value: an invalid or stale round fails the read.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::types::{Address, Price, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("price feed {feed} not found")]
    FeedNotFound { feed: Address },

    #[error("price feed {feed} has no rounds")]
    NoData { feed: Address },

    #[error("price feed {feed} reported non-positive answer {answer}")]
    InvalidAnswer { feed: Address, answer: i128 },

    #[error("price feed {feed} round {round_id} answered in earlier round {answered_in_round}")]
    IncompleteRound {
        feed: Address,
        round_id: u64,
        answered_in_round: u64,
    },

    #[error("price feed {feed} is stale: {age_secs}s old, max {max_age_secs}s")]
    Stale {
        feed: Address,
        age_secs: u64,
        max_age_secs: u64,
    },

    #[error("price {price} cannot be represented with {decimals} decimals")]
    Unrepresentable { price: Decimal, decimals: u32 },
}

/// One published answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRound {
    pub round_id: u64,
    /// Integer answer, scaled by the feed's decimals.
    pub answer: i128,
    pub updated_at: Timestamp,
    /// Round in which the answer was computed. Lower than `round_id` means the
    /// round was opened but never finished.
    pub answered_in_round: u64,
}

/// A validated price handed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleReading {
    pub feed: Address,
    pub price: Price,
    pub round_id: u64,
    pub updated_at: Timestamp,
}

/// A single feed with a bounded round history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeed {
    pub address: Address,
    pub description: String,
    pub decimals: u32,
    rounds: VecDeque<OracleRound>,
    max_history: usize,
}

impl PriceFeed {
    pub fn new(address: Address, description: &str, decimals: u32) -> Self {
        Self {
            address,
            description: description.to_string(),
            decimals,
            rounds: VecDeque::new(),
            max_history: 100,
        }
    }

    pub fn with_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    /// Publish a complete round with the given integer answer.
    pub fn push_answer(&mut self, answer: i128, now: Timestamp) -> u64 {
        let round_id = self.next_round_id();
        self.push_round(OracleRound {
            round_id,
            answer,
            updated_at: now,
            answered_in_round: round_id,
        });
        round_id
    }

    /// Publish a decimal price, scaling it to the feed's integer format.
    /// Digits beyond the feed's precision are truncated.
    pub fn push_price(&mut self, price: Decimal, now: Timestamp) -> Result<u64, OracleError> {
        let answer = self.scale(price)?;
        Ok(self.push_answer(answer, now))
    }

    /// Publish a raw round. Lets tests reproduce incomplete or malformed rounds.
    pub fn push_round(&mut self, round: OracleRound) {
        self.rounds.push_back(round);
        while self.rounds.len() > self.max_history {
            self.rounds.pop_front();
        }
    }

    pub fn latest_round(&self) -> Option<&OracleRound> {
        self.rounds.back()
    }

    pub fn round(&self, round_id: u64) -> Option<&OracleRound> {
        self.rounds.iter().find(|r| r.round_id == round_id)
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    fn next_round_id(&self) -> u64 {
        self.rounds.back().map(|r| r.round_id + 1).unwrap_or(1)
    }

    fn scale(&self, price: Decimal) -> Result<i128, OracleError> {
        let unrepresentable = OracleError::Unrepresentable {
            price,
            decimals: self.decimals,
        };
        let factor = 10i128
            .checked_pow(self.decimals)
            .and_then(|f| Decimal::try_from_i128_with_scale(f, 0).ok())
            .ok_or_else(|| unrepresentable.clone())?;
        let scaled = price
            .checked_mul(factor)
            .ok_or_else(|| unrepresentable.clone())?;
        scaled.trunc().to_i128().ok_or(unrepresentable)
    }

    // validity checks, in the order a careful consumer applies them
    fn validate(&self, now: Timestamp, max_age_secs: u64) -> Result<OracleReading, OracleError> {
        let feed = self.address;
        let round = self.latest_round().ok_or(OracleError::NoData { feed })?;

        if round.answer <= 0 {
            return Err(OracleError::InvalidAnswer {
                feed,
                answer: round.answer,
            });
        }

        if round.answered_in_round < round.round_id {
            return Err(OracleError::IncompleteRound {
                feed,
                round_id: round.round_id,
                answered_in_round: round.answered_in_round,
            });
        }

        let age_secs = round.updated_at.elapsed_secs(&now);
        if age_secs > max_age_secs {
            return Err(OracleError::Stale {
                feed,
                age_secs,
                max_age_secs,
            });
        }

        let value = Decimal::try_from_i128_with_scale(round.answer, self.decimals).map_err(|_| {
            OracleError::InvalidAnswer {
                feed,
                answer: round.answer,
            }
        })?;
        let price = Price::new(value).ok_or(OracleError::InvalidAnswer {
            feed,
            answer: round.answer,
        })?;

        Ok(OracleReading {
            feed,
            price,
            round_id: round.round_id,
            updated_at: round.updated_at,
        })
    }
}

/// Anything that can hand out validated prices.
pub trait PriceOracle {
    fn latest_reading(
        &self,
        feed: Address,
        now: Timestamp,
        max_age_secs: u64,
    ) -> Result<OracleReading, OracleError>;

    fn latest_price(
        &self,
        feed: Address,
        now: Timestamp,
        max_age_secs: u64,
    ) -> Result<Price, OracleError> {
        Ok(self.latest_reading(feed, now, max_age_secs)?.price)
    }
}

/// All feeds known to the chain, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct OracleBook {
    feeds: HashMap<Address, PriceFeed>,
}

impl OracleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&mut self, feed: PriceFeed) {
        self.feeds.insert(feed.address, feed);
    }

    pub fn feed(&self, feed: Address) -> Result<&PriceFeed, OracleError> {
        self.feeds.get(&feed).ok_or(OracleError::FeedNotFound { feed })
    }

    pub fn feed_mut(&mut self, feed: Address) -> Result<&mut PriceFeed, OracleError> {
        self.feeds
            .get_mut(&feed)
            .ok_or(OracleError::FeedNotFound { feed })
    }

    pub fn contains(&self, feed: Address) -> bool {
        self.feeds.contains_key(&feed)
    }
}

impl PriceOracle for OracleBook {
    fn latest_reading(
        &self,
        feed: Address,
        now: Timestamp,
        max_age_secs: u64,
    ) -> Result<OracleReading, OracleError> {
        self.feed(feed)?.validate(now, max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FEED: Address = Address(50);

    fn book_with(answer: i128, at: Timestamp) -> OracleBook {
        let mut feed = PriceFeed::new(FEED, "WETH / USD", 8);
        feed.push_answer(answer, at);
        let mut book = OracleBook::new();
        book.add_feed(feed);
        book
    }

    #[test]
    fn test_reading_scales_answer() {
        let book = book_with(2_000_00000000, Timestamp::from_secs(1000));
        let reading = book
            .latest_reading(FEED, Timestamp::from_secs(1010), 60)
            .unwrap();
        assert_eq!(reading.price.value(), dec!(2000));
        assert_eq!(reading.round_id, 1);
    }

    #[test]
    fn test_stale_round_rejected() {
        let book = book_with(2_000_00000000, Timestamp::from_secs(1000));
        assert!(book.latest_price(FEED, Timestamp::from_secs(1060), 60).is_ok());
        let result = book.latest_price(FEED, Timestamp::from_secs(1061), 60);
        assert!(matches!(result, Err(OracleError::Stale { age_secs: 61, .. })));
    }

    #[test]
    fn test_non_positive_answer_rejected() {
        let book = book_with(0, Timestamp::from_secs(1000));
        let result = book.latest_price(FEED, Timestamp::from_secs(1000), 60);
        assert!(matches!(result, Err(OracleError::InvalidAnswer { answer: 0, .. })));
    }

    #[test]
    fn test_incomplete_round_rejected() {
        let mut book = book_with(2_000_00000000, Timestamp::from_secs(1000));
        book.feed_mut(FEED).unwrap().push_round(OracleRound {
            round_id: 2,
            answer: 2_100_00000000,
            updated_at: Timestamp::from_secs(1001),
            answered_in_round: 1,
        });
        let result = book.latest_price(FEED, Timestamp::from_secs(1002), 60);
        assert!(matches!(result, Err(OracleError::IncompleteRound { .. })));
    }

    #[test]
    fn test_unknown_and_empty_feeds() {
        let mut book = OracleBook::new();
        let result = book.latest_price(FEED, Timestamp::from_secs(0), 60);
        assert!(matches!(result, Err(OracleError::FeedNotFound { .. })));

        book.add_feed(PriceFeed::new(FEED, "empty", 8));
        let result = book.latest_price(FEED, Timestamp::from_secs(0), 60);
        assert!(matches!(result, Err(OracleError::NoData { .. })));
    }

    #[test]
    fn test_push_price_truncates_and_bounds_history() {
        let mut feed = PriceFeed::new(FEED, "WETH / USD", 2).with_history(2);
        feed.push_price(dec!(1999.999), Timestamp::from_secs(1)).unwrap();
        assert_eq!(feed.latest_round().unwrap().answer, 199_999);

        feed.push_price(dec!(2000), Timestamp::from_secs(2)).unwrap();
        feed.push_price(dec!(2001), Timestamp::from_secs(3)).unwrap();
        assert_eq!(feed.round_count(), 2);
        assert!(feed.round(1).is_none());
        assert_eq!(feed.latest_round().unwrap().round_id, 3);
    }
}
