pub const OPERATIONAL_SETTING_COUNT: usize = 3;
pub const SENSOR_COUNT: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    OperationalSetting,
    Sensor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered numeric fields a model artifact was fit on.
///
/// The order is part of the model contract: the scaler and the classifier
/// index features by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    fields: Vec<FieldDescriptor>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Turbofan layout: three operational settings then 21 sensors.
    pub fn turbofan() -> Self {
        let settings = (1..=OPERATIONAL_SETTING_COUNT).map(|i| FieldDescriptor {
            name: format!("operational_setting_{i}"),
            kind: FieldKind::OperationalSetting,
        });
        let sensors = (1..=SENSOR_COUNT).map(|i| FieldDescriptor {
            name: format!("sensor_{i}"),
            kind: FieldKind::Sensor,
        });
        Self::new(settings.chain(sensors).collect())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Fields offered on the manual entry form, in display order.
pub fn manual_entry_fields() -> Vec<String> {
    let settings = (1..=OPERATIONAL_SETTING_COUNT).map(|i| format!("operational_setting_{i}"));
    let sensors = (1..=5).map(|i| format!("sensor_{i}"));
    settings.chain(sensors).collect()
}
