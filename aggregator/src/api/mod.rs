pub mod images;
pub mod rating;
pub mod restaurants;
pub mod utils;

use http::Method;
use routing::{Route, RouteActions};

/// What a matched route does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Root,
    ListRestaurants,
    GetRestaurant,
    CreateRestaurant,
    UpdateRestaurant,
    DeleteRestaurant,
    GetImage,
    DeleteImage,
    ListRestaurantImages,
    UploadRestaurantImage,
    SubmitRating,
}

impl Endpoint {
    /// Metric tag value.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Root => "root",
            Endpoint::ListRestaurants => "list_restaurants",
            Endpoint::GetRestaurant => "get_restaurant",
            Endpoint::CreateRestaurant => "create_restaurant",
            Endpoint::UpdateRestaurant => "update_restaurant",
            Endpoint::DeleteRestaurant => "delete_restaurant",
            Endpoint::GetImage => "get_image",
            Endpoint::DeleteImage => "delete_image",
            Endpoint::ListRestaurantImages => "list_restaurant_images",
            Endpoint::UploadRestaurantImage => "upload_restaurant_image",
            Endpoint::SubmitRating => "submit_rating",
        }
    }
}

pub fn routes() -> RouteActions<Endpoint> {
    RouteActions::new(vec![
        Route::new(Method::GET, "/", Endpoint::Root),
        Route::new(Method::GET, "/restaurants", Endpoint::ListRestaurants),
        Route::new(Method::POST, "/restaurants", Endpoint::CreateRestaurant),
        Route::new(Method::GET, "/restaurants/{id}", Endpoint::GetRestaurant),
        Route::new(Method::PATCH, "/restaurants/{id}", Endpoint::UpdateRestaurant),
        Route::new(Method::DELETE, "/restaurants/{id}", Endpoint::DeleteRestaurant),
        Route::new(Method::GET, "/restaurants/{id}/images", Endpoint::ListRestaurantImages),
        Route::new(Method::POST, "/restaurants/{id}/images", Endpoint::UploadRestaurantImage),
        Route::new(Method::GET, "/images/{id}", Endpoint::GetImage),
        Route::new(Method::DELETE, "/images/{id}", Endpoint::DeleteImage),
        Route::new(Method::POST, "/rating/{id}", Endpoint::SubmitRating),
    ])
}
