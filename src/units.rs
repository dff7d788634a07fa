mod currency;
mod energy;
mod power;
mod rate;

pub use self::{
    currency::Euro,
    energy::WattHours,
    power::Watts,
    rate::EuroPerMegawattHour,
};
