use rocket::Route;

mod public;
mod tokens;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(tokens::routes());
    routes.extend(voting::routes());
    routes
}
