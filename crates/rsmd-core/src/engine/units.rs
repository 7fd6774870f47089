use super::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Molar energy units understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyUnit {
    #[default]
    KilojoulePerMole,
    KilocaloriePerMole,
}

impl EnergyUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            EnergyUnit::KilojoulePerMole => "kJ/mol",
            EnergyUnit::KilocaloriePerMole => "kcal/mol",
        }
    }

    /// The molar gas constant expressed in this unit per Kelvin.
    pub fn gas_constant(self) -> f64 {
        match self {
            EnergyUnit::KilojoulePerMole => 0.008_314_462_618_153_24,
            EnergyUnit::KilocaloriePerMole => 0.001_987_204_258_640_83,
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kj/mol" => Ok(EnergyUnit::KilojoulePerMole),
            "kcal/mol" => Ok(EnergyUnit::KilocaloriePerMole),
            _ => Err(ConfigError::UnknownEnergyUnit(s.to_string())),
        }
    }
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The units in which the external engine reports lengths, times, energies and temperatures.
///
/// Only the energy unit influences any computation, through the gas constant used in the
/// Boltzmann factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSystem {
    pub length: &'static str,
    pub time: &'static str,
    pub energy: EnergyUnit,
    pub temperature: &'static str,
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self {
            length: "nm",
            time: "ps",
            energy: EnergyUnit::default(),
            temperature: "K",
        }
    }
}

impl UnitSystem {
    /// Creates the unit system for an energy unit given as `kJ/mol` or `kcal/mol`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnergyUnit`] for any other unit.
    pub fn from_energy_unit(unit: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            energy: unit.parse()?,
            ..Self::default()
        })
    }

    /// The molar gas constant `R` in `energy / K`.
    pub fn gas_constant(&self) -> f64 {
        self.energy.gas_constant()
    }

    /// `R · T`, the thermal energy at the given temperature.
    pub fn thermal_energy(&self, temperature: f64) -> f64 {
        self.gas_constant() * temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_unit_system_uses_kilojoule() {
        let units = UnitSystem::default();
        assert_eq!(units.energy, EnergyUnit::KilojoulePerMole);
        assert_eq!(units.length, "nm");
        assert!((units.gas_constant() - 0.00831446261815324).abs() < 1e-15);
    }

    #[test]
    fn energy_unit_is_parsed_case_insensitively() {
        let units = UnitSystem::from_energy_unit("KCAL/mol").unwrap();
        assert_eq!(units.energy, EnergyUnit::KilocaloriePerMole);
        assert!((units.thermal_energy(300.0) - 0.596161277592249).abs() < 1e-12);
    }

    #[test]
    fn unknown_energy_unit_is_rejected() {
        assert_eq!(
            UnitSystem::from_energy_unit("eV"),
            Err(ConfigError::UnknownEnergyUnit("eV".to_string()))
        );
    }

    #[test]
    fn energy_unit_display_uses_symbol() {
        assert_eq!(EnergyUnit::KilocaloriePerMole.to_string(), "kcal/mol");
    }
}
