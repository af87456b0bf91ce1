mod helpers;
mod models;
mod pipeline;
mod queue;
