use super::icons::{classify, IconId};
use super::types::*;
use crate::utils::{mean, round_half_up};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};

/// Days shown in the daily strip
pub const MAX_DAYS: usize = 5;
/// Samples shown in the hourly strip (8 x 3h = 24h)
pub const HOURLY_SLOTS: usize = 8;

/// Time zone that decides where one calendar day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForecastZone {
    /// Zone of the running process
    Local,
    Named(chrono_tz::Tz),
}

impl ForecastZone {
    pub fn from_config(timezone: Option<&str>) -> Result<Self, String> {
        match timezone {
            Some(tz) => Ok(ForecastZone::Named(crate::utils::parse_timezone(tz)?)),
            None => Ok(ForecastZone::Local),
        }
    }

    pub fn aggregate_daily(&self, samples: &[ForecastSample], now: DateTime<Utc>) -> Vec<DaySummary> {
        match self {
            ForecastZone::Local => aggregate_daily(samples, &Local, now),
            ForecastZone::Named(tz) => aggregate_daily(samples, tz, now),
        }
    }

    pub fn select_hourly(&self, samples: &[ForecastSample]) -> Vec<HourlySlot> {
        match self {
            ForecastZone::Local => select_hourly(samples, &Local),
            ForecastZone::Named(tz) => select_hourly(samples, tz),
        }
    }
}

struct DayBucket {
    date: NaiveDate,
    label: String,
    icon: IconId,
    description: String,
    temperatures: Vec<f64>,
    humidities: Vec<f64>,
}

impl DayBucket {
    fn open(date: NaiveDate, today: NaiveDate, first: &ForecastSample) -> Self {
        let label = if date == today {
            "Today".to_string()
        } else {
            date.format("%A").to_string()
        };

        Self {
            date,
            label,
            icon: classify(&first.condition_code),
            description: first.description.clone(),
            temperatures: Vec::new(),
            humidities: Vec::new(),
        }
    }

    fn push(&mut self, sample: &ForecastSample) {
        if let Some(temp) = sample.temperature {
            self.temperatures.push(temp);
        }
        if let Some(rh) = sample.humidity {
            self.humidities.push(rh);
        }
    }

    fn summarize(self) -> DaySummary {
        let high = self.temperatures.iter().copied().reduce(f64::max);
        let low = self.temperatures.iter().copied().reduce(f64::min);

        DaySummary {
            date: self.date,
            label: self.label,
            high: high.map(round_half_up),
            low: low.map(round_half_up),
            humidity: mean(&self.humidities).map(round_half_up),
            icon: self.icon,
            description: self.description,
        }
    }
}

fn local_date<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(tz).date_naive())
}

/// Group 3-hour samples into calendar days, in first-seen order.
///
/// The representative icon and description of a day come from the first sample
/// seen for it. Samples keep feeding their day even when they recur out of order.
pub fn aggregate_daily<Tz: TimeZone>(
    samples: &[ForecastSample],
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<DaySummary> {
    let today = now.with_timezone(tz).date_naive();
    let mut buckets: Vec<DayBucket> = Vec::new();

    for sample in samples {
        let Some(date) = local_date(sample.timestamp, tz) else {
            tracing::debug!("Skipping forecast sample with out-of-range timestamp {}", sample.timestamp);
            continue;
        };

        let index = match buckets.iter().position(|b| b.date == date) {
            Some(index) => index,
            None => {
                buckets.push(DayBucket::open(date, today, sample));
                buckets.len() - 1
            }
        };
        buckets[index].push(sample);
    }

    buckets
        .into_iter()
        .take(MAX_DAYS)
        .map(DayBucket::summarize)
        .collect()
}

pub fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{} AM", hour),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

/// First eight samples as-is, with a display label and icon
pub fn select_hourly<Tz: TimeZone>(samples: &[ForecastSample], tz: &Tz) -> Vec<HourlySlot> {
    samples
        .iter()
        .take(HOURLY_SLOTS)
        .map(|sample| {
            let label = DateTime::from_timestamp(sample.timestamp, 0)
                .map(|dt| hour_label(dt.with_timezone(tz).hour()))
                .unwrap_or_default();

            HourlySlot {
                timestamp: sample.timestamp,
                label,
                temperature: sample.temperature.map(round_half_up),
                icon: classify(&sample.condition_code),
                description: sample.description.clone(),
            }
        })
        .collect()
}
