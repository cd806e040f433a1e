use rocket::launch;

#[launch]
fn rocket() -> _ {
    conduit::rocket()
}
