use super::directory::require_consumer;
use super::stations::require_station;
use super::{ServiceError, Store};
use crate::adapters::db::{self, NewRating};
use crate::domain::models::Rating;

const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct NewRatingRequest {
    pub consumer_id: i64,
    pub station_id: i64,
    pub stars: i64,
    pub comment: Option<String>,
}

/// Consumer reviews of stations. A consumer may rate a station more than once.
#[derive(Clone)]
pub struct RatingRegistry {
    store: Store,
}

impl RatingRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn submit_rating(&self, request: NewRatingRequest) -> Result<Rating, ServiceError> {
        let stars = u8::try_from(request.stars)
            .ok()
            .filter(|stars| (1..=5).contains(stars))
            .ok_or_else(|| {
                ServiceError::invalid(format!(
                    "stars must be between 1 and 5, got {}",
                    request.stars
                ))
            })?;
        let comment = request
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());
        if let Some(comment) = &comment
            && comment.chars().count() > MAX_COMMENT_CHARS
        {
            return Err(ServiceError::invalid(format!(
                "comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }

        let rating = self.store.write(|connection| {
            require_consumer(connection, request.consumer_id)?;
            require_station(connection, request.station_id)?;

            let id = db::insert_rating(
                connection,
                &NewRating {
                    consumer_id: request.consumer_id,
                    station_id: request.station_id,
                    stars,
                    comment,
                },
            )?;
            db::get_rating(connection, id)?.ok_or_else(|| ServiceError::not_found("rating", id))
        })?;

        tracing::info!(
            rating_id = rating.id,
            consumer_id = rating.consumer_id,
            station_id = rating.station_id,
            stars = rating.stars,
            "station rated"
        );
        Ok(rating)
    }

    /// Oldest first.
    pub fn list_by_station(&self, station_id: i64) -> Result<Vec<Rating>, ServiceError> {
        self.store.read(|connection| {
            require_station(connection, station_id)?;
            Ok(db::list_ratings_by_station(connection, station_id)?)
        })
    }
}
