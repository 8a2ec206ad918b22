use std::sync::Arc;

use crate::application::news::NewsService;
use crate::application::repos::HealthRepo;
use crate::application::tags::TagService;

#[derive(Clone)]
pub struct ApiState {
    pub news: Arc<NewsService>,
    pub tags: Arc<TagService>,
    pub health: Arc<dyn HealthRepo>,
}
