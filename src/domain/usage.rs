use super::clock::TimestampMs;

const CO2_AVOIDED_KG_PER_KWH: f64 = 0.25;
const KM_PER_KWH: f64 = 6.0;

/// A closed session joined with the rating of the outlet it ran on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedSessionUsage {
    pub started_at: TimestampMs,
    pub ended_at: TimestampMs,
    pub cost_per_hour: f64,
    pub max_power_kw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageSummary {
    pub total_sessions: usize,
    pub total_hours: f64,
    pub estimated_energy_kwh: f64,
    pub estimated_cost: f64,
    pub co2_avoided_kg: f64,
    pub km_equivalent: f64,
}

/// Energy is estimated as elapsed hours at the outlet's rated power; there is
/// no metering data.
pub fn summarize_usage(sessions: &[ClosedSessionUsage]) -> UsageSummary {
    let mut summary = UsageSummary {
        total_sessions: sessions.len(),
        ..UsageSummary::default()
    };

    for session in sessions {
        let hours = session.started_at.hours_until(session.ended_at);
        summary.total_hours += hours;
        summary.estimated_energy_kwh += hours * session.max_power_kw;
        summary.estimated_cost += hours * session.cost_per_hour;
    }

    summary.co2_avoided_kg = summary.estimated_energy_kwh * CO2_AVOIDED_KG_PER_KWH;
    summary.km_equivalent = summary.estimated_energy_kwh * KM_PER_KWH;
    summary
}

#[cfg(test)]
mod tests {
    use super::{ClosedSessionUsage, TimestampMs, UsageSummary, summarize_usage};

    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn empty_history_yields_zeroes() {
        assert_eq!(summarize_usage(&[]), UsageSummary::default());
    }

    #[test]
    fn sums_energy_cost_and_impact() {
        let sessions = [
            ClosedSessionUsage {
                started_at: TimestampMs(0),
                ended_at: TimestampMs(2 * HOUR_MS),
                cost_per_hour: 2.5,
                max_power_kw: 22.0,
            },
            ClosedSessionUsage {
                started_at: TimestampMs(10 * HOUR_MS),
                ended_at: TimestampMs(10 * HOUR_MS + HOUR_MS / 2),
                cost_per_hour: 4.0,
                max_power_kw: 50.0,
            },
        ];

        let summary = summarize_usage(&sessions);

        assert_eq!(summary.total_sessions, 2);
        assert!((summary.total_hours - 2.5).abs() < 1e-9);
        assert!((summary.estimated_energy_kwh - 69.0).abs() < 1e-9);
        assert!((summary.estimated_cost - 7.0).abs() < 1e-9);
        assert!((summary.co2_avoided_kg - 17.25).abs() < 1e-9);
        assert!((summary.km_equivalent - 414.0).abs() < 1e-9);
    }
}
