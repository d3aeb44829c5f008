// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard analytics: headline counters, chart series and revenue.
//!
//! Series are bucketed by UTC calendar day / month.

use crate::db::{collections, FirestoreDb};
use crate::error::AppError;
use crate::models::booking::PaymentStatus;
use crate::models::stats::{
    DashboardStats, RatingPoint, RatingTrend, RevenueReport, RideCountPoint,
};
use crate::models::{Bike, Booking, BookingStatus, Review, Ride, User};
use crate::services::cache::TtlCache;
use crate::time_utils;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const BIKES_TTL: Duration = Duration::from_secs(60);
const USERS_TTL: Duration = Duration::from_secs(300);
const RIDES_TTL: Duration = Duration::from_secs(30);
const REVIEWS_TTL: Duration = Duration::from_secs(600);

/// Rides considered by the summary.
pub const RECENT_RIDES_LIMIT: u32 = 100;

/// Chart window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartRange {
    /// Last 7 days, one bucket per day
    #[default]
    Weekly,
    /// Last 6 months, one bucket per month
    Monthly,
}

/// Revenue period, always ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenuePeriod {
    Day,
    /// Since the most recent Sunday
    Week,
    Month,
}

impl RevenuePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenuePeriod::Day => "day",
            RevenuePeriod::Week => "week",
            RevenuePeriod::Month => "month",
        }
    }

    /// Start of the period containing `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let day = match self {
            RevenuePeriod::Day => today,
            RevenuePeriod::Week => today
                .checked_sub_days(Days::new(today.weekday().num_days_from_sunday() as u64))
                .unwrap_or(today),
            RevenuePeriod::Month => today.with_day(1).unwrap_or(today),
        };
        midnight(day)
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Cached collection snapshots plus the analytics computed from them.
pub struct AnalyticsService {
    db: FirestoreDb,
    bikes: TtlCache<&'static str, Vec<Bike>>,
    users: TtlCache<&'static str, Vec<User>>,
    rides: TtlCache<&'static str, Vec<Ride>>,
    reviews: TtlCache<&'static str, Vec<Review>>,
}

impl AnalyticsService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            bikes: TtlCache::new(BIKES_TTL),
            users: TtlCache::new(USERS_TTL),
            rides: TtlCache::new(RIDES_TTL),
            reviews: TtlCache::new(REVIEWS_TTL),
        }
    }

    pub async fn bikes(&self) -> Result<Arc<Vec<Bike>>, AppError> {
        self.bikes
            .get_or_try_load(collections::BIKES, || self.db.list_bikes())
            .await
    }

    pub async fn users(&self) -> Result<Arc<Vec<User>>, AppError> {
        self.users
            .get_or_try_load(collections::USERS, || self.db.list_users())
            .await
    }

    pub async fn recent_rides(&self) -> Result<Arc<Vec<Ride>>, AppError> {
        self.rides
            .get_or_try_load(collections::RIDES, || {
                self.db.list_rides_page(None, None, RECENT_RIDES_LIMIT)
            })
            .await
    }

    pub async fn reviews(&self) -> Result<Arc<Vec<Review>>, AppError> {
        self.reviews
            .get_or_try_load(collections::REVIEWS, || self.db.list_reviews(None, None))
            .await
    }

    pub fn invalidate_bikes(&self) {
        self.bikes.invalidate(&collections::BIKES);
    }

    pub fn invalidate_users(&self) {
        self.users.invalidate(&collections::USERS);
    }

    pub fn invalidate_rides(&self) {
        self.rides.invalidate(&collections::RIDES);
    }

    pub fn invalidate_reviews(&self) {
        self.reviews.invalidate(&collections::REVIEWS);
    }

    pub async fn summary(&self) -> Result<DashboardStats, AppError> {
        let (bikes, users, rides, reviews) = tokio::try_join!(
            self.bikes(),
            self.users(),
            self.recent_rides(),
            self.reviews()
        )?;
        Ok(calculate_stats(&bikes, &users, &rides, &reviews))
    }

    pub async fn ride_activity(&self, range: ChartRange) -> Result<Vec<RideCountPoint>, AppError> {
        let rides = self.recent_rides().await?;
        Ok(ride_activity(&rides, range, Utc::now()))
    }

    pub async fn rating_trend(&self, range: ChartRange) -> Result<RatingTrend, AppError> {
        let reviews = self.reviews().await?;
        Ok(rating_trend(&reviews, range, Utc::now()))
    }

    /// Revenue skips the snapshot cache.
    pub async fn revenue(&self, period: RevenuePeriod) -> Result<RevenueReport, AppError> {
        let bookings = self.db.list_bookings(None, None).await?;
        Ok(revenue_report(&bookings, period, Utc::now()))
    }
}

/// Headline counters.
///
/// When bikes carry their own review aggregate, the review figures are the
/// weighted mean of those; otherwise they come from the review documents.
pub fn calculate_stats(
    bikes: &[Bike],
    users: &[User],
    rides: &[Ride],
    reviews: &[Review],
) -> DashboardStats {
    let active_bikes = bikes
        .iter()
        .filter(|b| b.is_available && !b.is_in_use)
        .count();
    let in_use_bikes = bikes.iter().filter(|b| b.is_in_use).count();

    let rated_bikes: Vec<(f64, u32)> = bikes
        .iter()
        .filter_map(|b| Some((b.average_rating?, b.total_reviews?)))
        .collect();

    let (total_reviews, average_rating) = if rated_bikes.is_empty() {
        let ratings: Vec<f64> = reviews
            .iter()
            .map(|r| r.rating)
            .filter(|r| r.is_finite() && *r > 0.0)
            .collect();
        let average = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };
        (reviews.len() as u64, average)
    } else {
        let total: u64 = rated_bikes.iter().map(|(_, n)| *n as u64).sum();
        let average = if total > 0 {
            rated_bikes
                .iter()
                .map(|(avg, n)| avg * *n as f64)
                .sum::<f64>()
                / total as f64
        } else {
            0.0
        };
        (total, average)
    };

    DashboardStats {
        total_bikes: bikes.len(),
        active_bikes,
        in_use_bikes,
        maintenance_bikes: bikes.len().saturating_sub(active_bikes + in_use_bikes),
        total_users: users.len(),
        verified_users: users.iter().filter(|u| u.is_verified()).count(),
        active_rides: rides.iter().filter(|r| r.status.is_live()).count(),
        total_rides: rides.len(),
        total_reviews,
        average_rating: round1(average_rating),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One chart bucket: a calendar day or month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Day(NaiveDate),
    Month(i32, u32),
}

impl Bucket {
    fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Bucket::Day(day) => day == date,
            Bucket::Month(year, month) => date.year() == year && date.month() == month,
        }
    }

    fn label(&self) -> String {
        match *self {
            Bucket::Day(day) => day.format("%a").to_string(),
            Bucket::Month(year, month) => NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Buckets of the window ending at `now`, oldest first.
fn buckets(range: ChartRange, now: DateTime<Utc>) -> Vec<Bucket> {
    let today = now.date_naive();
    match range {
        ChartRange::Weekly => (0..7u64)
            .rev()
            .filter_map(|i| today.checked_sub_days(Days::new(i)))
            .map(Bucket::Day)
            .collect(),
        ChartRange::Monthly => (0..6u32)
            .rev()
            .filter_map(|i| today.with_day(1)?.checked_sub_months(Months::new(i)))
            .map(|d| Bucket::Month(d.year(), d.month()))
            .collect(),
    }
}

/// Ride counts per bucket.
pub fn ride_activity(rides: &[Ride], range: ChartRange, now: DateTime<Utc>) -> Vec<RideCountPoint> {
    let start_dates: Vec<NaiveDate> = rides
        .iter()
        .map(|r| time_utils::from_millis(r.start_time).date_naive())
        .collect();

    buckets(range, now)
        .into_iter()
        .map(|bucket| RideCountPoint {
            label: bucket.label(),
            rides: start_dates.iter().filter(|d| bucket.contains(**d)).count() as u32,
        })
        .collect()
}

/// Average rating per bucket plus the overall mean of the window.
pub fn rating_trend(reviews: &[Review], range: ChartRange, now: DateTime<Utc>) -> RatingTrend {
    let rated: Vec<(NaiveDate, f64)> = reviews
        .iter()
        .filter(|r| r.has_valid_rating())
        .filter_map(|r| Some((r.timestamp?.date_naive(), r.rating)))
        .collect();

    let mut window_sum = 0.0;
    let mut window_count = 0u32;

    let points = buckets(range, now)
        .into_iter()
        .map(|bucket| {
            let ratings: Vec<f64> = rated
                .iter()
                .filter(|(d, _)| bucket.contains(*d))
                .map(|(_, r)| *r)
                .collect();
            let count = ratings.len() as u32;
            let sum: f64 = ratings.iter().sum();
            window_sum += sum;
            window_count += count;

            RatingPoint {
                label: bucket.label(),
                average_rating: (count > 0).then(|| round1(sum / count as f64)),
                reviews: count,
            }
        })
        .collect();

    RatingTrend {
        points,
        overall_average: (window_count > 0).then(|| round1(window_sum / window_count as f64)),
    }
}

/// Revenue from completed, paid bookings that started in the period.
pub fn revenue_report(
    bookings: &[Booking],
    period: RevenuePeriod,
    now: DateTime<Utc>,
) -> RevenueReport {
    let start = period.start(now);
    let in_period: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.start_time >= start && b.start_time <= now)
        .collect();

    let total_revenue = in_period
        .iter()
        .filter(|b| b.status == BookingStatus::Completed && b.payment_status == PaymentStatus::Paid)
        .map(|b| b.total_price)
        .filter(|p| p.is_finite())
        .sum();

    RevenueReport {
        period: period.as_str().to_string(),
        total_revenue,
        bookings: in_period.len(),
        start_date: start,
        end_date: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bike::tests::make_bike;
    use crate::models::booking::tests::make_booking;
    use crate::models::ride::tests::make_ride;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn review(rating: f64, at: DateTime<Utc>) -> Review {
        Review {
            id: String::new(),
            doc_id: None,
            bike_id: "b1".to_string(),
            user_id: "u1".to_string(),
            user_name: "Rider".to_string(),
            rating,
            comment: String::new(),
            timestamp: Some(at),
        }
    }

    #[test]
    fn test_stats_fleet_counters() {
        let available = make_bike("b1");
        let mut in_use = make_bike("b2");
        in_use.begin_ride("u1", "r1", Utc::now()).unwrap();
        let mut broken = make_bike("b3");
        broken.set_maintenance(crate::models::MaintenanceStatus::Repair, "", Utc::now());

        let mut done = make_ride("r0");
        done.cancel(done.start_time + 1000).unwrap();
        let rides = vec![make_ride("r1"), done];

        let stats = calculate_stats(&[available, in_use, broken], &[], &rides, &[]);
        assert_eq!(stats.total_bikes, 3);
        assert_eq!(stats.active_bikes, 1);
        assert_eq!(stats.in_use_bikes, 1);
        assert_eq!(stats.maintenance_bikes, 1);
        assert_eq!(stats.active_rides, 1);
        assert_eq!(stats.total_rides, 2);
    }

    #[test]
    fn test_stats_prefers_bike_review_aggregates() {
        let mut a = make_bike("b1");
        a.average_rating = Some(4.0);
        a.total_reviews = Some(3);
        let mut b = make_bike("b2");
        b.average_rating = Some(5.0);
        b.total_reviews = Some(1);

        let reviews = vec![review(1.0, Utc::now())];
        let stats = calculate_stats(&[a, b], &[], &[], &reviews);
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.average_rating, 4.3);
    }

    #[test]
    fn test_stats_falls_back_to_review_documents() {
        let reviews = vec![
            review(5.0, Utc::now()),
            review(4.0, Utc::now()),
            review(0.0, Utc::now()),
        ];
        let stats = calculate_stats(&[make_bike("b1")], &[], &[], &reviews);
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.average_rating, 4.5);
    }

    #[test]
    fn test_weekly_ride_activity() {
        // Wednesday
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
        let mut today = make_ride("r1");
        today.start_time = time_utils::to_millis(now - ChronoDuration::hours(2));
        let mut monday = make_ride("r2");
        monday.start_time = time_utils::to_millis(now - ChronoDuration::days(2));
        let mut old = make_ride("r3");
        old.start_time = time_utils::to_millis(now - ChronoDuration::days(30));

        let series = ride_activity(&[today, monday, old], ChartRange::Weekly, now);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].label, "Thu");
        assert_eq!(series[6].label, "Wed");
        assert_eq!(series[6].rides, 1);
        assert_eq!(series[4].label, "Mon");
        assert_eq!(series[4].rides, 1);
        assert_eq!(series.iter().map(|p| p.rides).sum::<u32>(), 2);
    }

    #[test]
    fn test_monthly_buckets_cross_year() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap();
        let labels: Vec<String> = ride_activity(&[], ChartRange::Monthly, now)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, ["Sep", "Oct", "Nov", "Dec", "Jan", "Feb"]);
    }

    #[test]
    fn test_rating_trend() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
        let reviews = vec![
            review(5.0, now),
            review(4.0, now),
            review(3.0, now - ChronoDuration::days(1)),
            review(2.0, now - ChronoDuration::days(20)),
        ];
        let trend = rating_trend(&reviews, ChartRange::Weekly, now);
        assert_eq!(trend.points[6].average_rating, Some(4.5));
        assert_eq!(trend.points[6].reviews, 2);
        assert_eq!(trend.points[5].average_rating, Some(3.0));
        assert_eq!(trend.points[0].average_rating, None);
        assert_eq!(trend.overall_average, Some(4.0));
    }

    #[test]
    fn test_week_starts_on_sunday() {
        // Wednesday 2026-03-04
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
        assert_eq!(
            RevenuePeriod::Week.start(now),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            RevenuePeriod::Month.start(now),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            RevenuePeriod::Day.start(now),
            Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_revenue_counts_completed_paid_only() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();

        let mut paid = make_booking("bk1");
        paid.start_time = now - ChronoDuration::hours(3);
        paid.status = BookingStatus::Completed;
        paid.payment_status = PaymentStatus::Paid;
        paid.total_price = 50.0;

        let mut unpaid = paid.clone();
        unpaid.payment_status = PaymentStatus::Unpaid;

        let mut last_month = paid.clone();
        last_month.start_time = now - ChronoDuration::days(40);

        let report = revenue_report(&[paid, unpaid, last_month], RevenuePeriod::Month, now);
        assert_eq!(report.total_revenue, 50.0);
        assert_eq!(report.bookings, 2);
        assert_eq!(report.period, "month");
    }
}
