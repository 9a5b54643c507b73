//! Analytics panel: aggregates computed in the store, shaped here.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use farmaid_types::api::{AnalyticsResponse, CategoryVolume, MonthlyTotal};

use crate::auth::AppState;

/// GET /analytics
pub async fn get_analytics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let (monthly, by_crop, stats) = tokio::task::spawn_blocking(move || {
        let monthly = db.monthly_donation_totals()?;
        let by_crop = db.volume_by_crop()?;
        let stats = db.donation_stats()?;
        Ok::<_, farmaid_db::StoreError>((monthly, by_crop, stats))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(crate::store_error)?;

    let (total_donors, total_donated_centavos, donation_count) = stats;

    let monthly_donations: Vec<MonthlyTotal> = monthly
        .into_iter()
        .map(|(month, total_centavos)| MonthlyTotal {
            month,
            total_centavos,
        })
        .collect();

    let volume_by_crop: Vec<CategoryVolume> = by_crop
        .into_iter()
        .map(|(crop, transactions)| CategoryVolume { crop, transactions })
        .collect();

    Ok(Json(AnalyticsResponse {
        donation_growth_pct: growth_pct(&monthly_donations),
        average_donation_centavos: if donation_count > 0 {
            total_donated_centavos / donation_count
        } else {
            0
        },
        monthly_donations,
        volume_by_crop,
        total_donors,
        total_donated_centavos,
    }))
}

/// Month-over-month change of the two most recent buckets, in percent.
/// Undefined with fewer than two buckets or a zero prior month.
fn growth_pct(monthly: &[MonthlyTotal]) -> Option<f64> {
    let [.., previous, latest] = monthly else {
        return None;
    };
    if previous.total_centavos == 0 {
        return None;
    }
    let prev = previous.total_centavos as f64;
    let last = latest.total_centavos as f64;
    Some((last - prev) / prev * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(month: &str, total_centavos: i64) -> MonthlyTotal {
        MonthlyTotal {
            month: month.into(),
            total_centavos,
        }
    }

    #[test]
    fn growth_compares_the_two_latest_months() {
        let monthly = vec![
            bucket("2025-03", 100_000),
            bucket("2025-04", 500_000),
            bucket("2025-05", 250_000),
        ];
        assert_eq!(growth_pct(&monthly), Some(-50.0));
    }

    #[test]
    fn growth_is_undefined_without_a_prior_month() {
        assert_eq!(growth_pct(&[]), None);
        assert_eq!(growth_pct(&[bucket("2025-05", 100)]), None);
        assert_eq!(growth_pct(&[bucket("2025-04", 0), bucket("2025-05", 100)]), None);
    }
}
