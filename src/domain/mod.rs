pub mod engagement;
pub mod group;
pub mod media;
pub mod post;
pub mod social_graph;
pub mod user;
pub mod workout;
