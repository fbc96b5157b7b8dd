use dynamodb_provider_apis::{Key, Role, Table, User};
use kube::CustomResourceExt;
use serde_yaml;

pub fn main() {
    println!("{}", serde_yaml::to_string(&Table::crd()).unwrap());
    println!("---");
    println!("{}", serde_yaml::to_string(&Key::crd()).unwrap());
    println!("---");
    println!("{}", serde_yaml::to_string(&User::crd()).unwrap());
    println!("---");
    println!("{}", serde_yaml::to_string(&Role::crd()).unwrap());
}
