use crate::error::ParseError;
use crate::model::Element;
use crate::parser::step::{StepEntity, StepFile, StepValue};
use std::collections::HashMap;
use std::path::Path;

/// Instantiable entity types deriving from `IfcElement` (IFC2X3, IFC4 and
/// IFC4X3), grouped by their intermediate supertype.
const ELEMENT_TYPES: &[&str] = &[
    // IfcBuildingElement / IfcBuiltElement
    "IFCBEAM",
    "IFCBEAMSTANDARDCASE",
    "IFCBEARING",
    "IFCBUILDINGELEMENTPROXY",
    "IFCBUILTELEMENT",
    "IFCCAISSONFOUNDATION",
    "IFCCHIMNEY",
    "IFCCOLUMN",
    "IFCCOLUMNSTANDARDCASE",
    "IFCCOURSE",
    "IFCCOVERING",
    "IFCCURTAINWALL",
    "IFCDEEPFOUNDATION",
    "IFCDOOR",
    "IFCDOORSTANDARDCASE",
    "IFCFOOTING",
    "IFCKERB",
    "IFCMEMBER",
    "IFCMEMBERSTANDARDCASE",
    "IFCMOORINGDEVICE",
    "IFCNAVIGATIONELEMENT",
    "IFCPAVEMENT",
    "IFCPILE",
    "IFCPLATE",
    "IFCPLATESTANDARDCASE",
    "IFCRAIL",
    "IFCRAILING",
    "IFCRAMP",
    "IFCRAMPFLIGHT",
    "IFCROOF",
    "IFCSHADINGDEVICE",
    "IFCSLAB",
    "IFCSLABELEMENTEDCASE",
    "IFCSLABSTANDARDCASE",
    "IFCSTAIR",
    "IFCSTAIRFLIGHT",
    "IFCTRACKELEMENT",
    "IFCWALL",
    "IFCWALLELEMENTEDCASE",
    "IFCWALLSTANDARDCASE",
    "IFCWINDOW",
    "IFCWINDOWSTANDARDCASE",
    // IfcElementComponent
    "IFCBUILDINGELEMENTPART",
    "IFCDISCRETEACCESSORY",
    "IFCFASTENER",
    "IFCIMPACTPROTECTIONDEVICE",
    "IFCMECHANICALFASTENER",
    "IFCREINFORCINGBAR",
    "IFCREINFORCINGMESH",
    "IFCSIGN",
    "IFCTENDON",
    "IFCTENDONANCHOR",
    "IFCTENDONCONDUIT",
    "IFCVIBRATIONDAMPER",
    "IFCVIBRATIONISOLATOR",
    // IfcDistributionElement and IfcDistributionControlElement
    "IFCDISTRIBUTIONELEMENT",
    "IFCDISTRIBUTIONCONTROLELEMENT",
    "IFCACTUATOR",
    "IFCALARM",
    "IFCCONTROLLER",
    "IFCFLOWINSTRUMENT",
    "IFCPROTECTIVEDEVICETRIPPINGUNIT",
    "IFCSENSOR",
    "IFCUNITARYCONTROLELEMENT",
    // IfcDistributionFlowElement
    "IFCDISTRIBUTIONFLOWELEMENT",
    "IFCDISTRIBUTIONCHAMBERELEMENT",
    // IfcEnergyConversionDevice
    "IFCENERGYCONVERSIONDEVICE",
    "IFCAIRTOAIRHEATRECOVERY",
    "IFCBOILER",
    "IFCBURNER",
    "IFCCHILLER",
    "IFCCOIL",
    "IFCCONDENSER",
    "IFCCOOLEDBEAM",
    "IFCCOOLINGTOWER",
    "IFCELECTRICGENERATOR",
    "IFCELECTRICMOTOR",
    "IFCENGINE",
    "IFCEVAPORATIVECOOLER",
    "IFCEVAPORATOR",
    "IFCHEATEXCHANGER",
    "IFCHUMIDIFIER",
    "IFCMOTORCONNECTION",
    "IFCSOLARDEVICE",
    "IFCTRANSFORMER",
    "IFCTUBEBUNDLE",
    "IFCUNITARYEQUIPMENT",
    // IfcFlowController
    "IFCFLOWCONTROLLER",
    "IFCAIRTERMINALBOX",
    "IFCDAMPER",
    "IFCDISTRIBUTIONBOARD",
    "IFCELECTRICDISTRIBUTIONBOARD",
    "IFCELECTRICTIMECONTROL",
    "IFCFLOWMETER",
    "IFCPROTECTIVEDEVICE",
    "IFCSWITCHINGDEVICE",
    "IFCVALVE",
    // IfcFlowFitting
    "IFCFLOWFITTING",
    "IFCCABLECARRIERFITTING",
    "IFCCABLEFITTING",
    "IFCDUCTFITTING",
    "IFCJUNCTIONBOX",
    "IFCPIPEFITTING",
    // IfcFlowMovingDevice
    "IFCFLOWMOVINGDEVICE",
    "IFCCOMPRESSOR",
    "IFCFAN",
    "IFCPUMP",
    // IfcFlowSegment
    "IFCFLOWSEGMENT",
    "IFCCABLECARRIERSEGMENT",
    "IFCCABLESEGMENT",
    "IFCCONVEYORSEGMENT",
    "IFCDUCTSEGMENT",
    "IFCPIPESEGMENT",
    // IfcFlowStorageDevice
    "IFCFLOWSTORAGEDEVICE",
    "IFCELECTRICFLOWSTORAGEDEVICE",
    "IFCTANK",
    // IfcFlowTerminal
    "IFCFLOWTERMINAL",
    "IFCAIRTERMINAL",
    "IFCAUDIOVISUALAPPLIANCE",
    "IFCCOMMUNICATIONSAPPLIANCE",
    "IFCELECTRICAPPLIANCE",
    "IFCFIRESUPPRESSIONTERMINAL",
    "IFCLAMP",
    "IFCLIGHTFIXTURE",
    "IFCLIQUIDTERMINAL",
    "IFCMEDICALDEVICE",
    "IFCMOBILETELECOMMUNICATIONSAPPLIANCE",
    "IFCOUTLET",
    "IFCSANITARYTERMINAL",
    "IFCSIGNAL",
    "IFCSPACEHEATER",
    "IFCSTACKTERMINAL",
    "IFCWASTETERMINAL",
    // IfcFlowTreatmentDevice
    "IFCFLOWTREATMENTDEVICE",
    "IFCDUCTSILENCER",
    "IFCELECTRICFLOWTREATMENTDEVICE",
    "IFCFILTER",
    "IFCINTERCEPTOR",
    // IFC2X3 only
    "IFCELECTRICALELEMENT",
    "IFCELECTRICDISTRIBUTIONPOINT",
    "IFCEQUIPMENTELEMENT",
    "IFCEDGEFEATURE",
    "IFCCHAMFEREDGEFEATURE",
    "IFCROUNDEDEDGEFEATURE",
    // Feature elements
    "IFCOPENINGELEMENT",
    "IFCOPENINGSTANDARDCASE",
    "IFCPROJECTIONELEMENT",
    "IFCSURFACEFEATURE",
    "IFCVOIDINGFEATURE",
    "IFCEARTHWORKSCUT",
    // Geotechnical elements
    "IFCBOREHOLE",
    "IFCGEOMODEL",
    "IFCGEOSLICE",
    "IFCGEOTECHNICALSTRATUM",
    // Other elements
    "IFCCIVILELEMENT",
    "IFCEARTHWORKSFILL",
    "IFCELEMENTASSEMBLY",
    "IFCFURNISHINGELEMENT",
    "IFCFURNITURE",
    "IFCGEOGRAPHICELEMENT",
    "IFCREINFORCEDSOIL",
    "IFCSYSTEMFURNITUREELEMENT",
    "IFCTRANSPORTELEMENT",
    "IFCVEHICLE",
    "IFCVIRTUALELEMENT",
];

/// Relationships listing their related objects at attribute 4.
const ELEMENT_RELATIONS: &[&str] = &[
    "IFCRELASSOCIATESMATERIAL",
    "IFCRELDEFINESBYPROPERTIES",
    "IFCRELDEFINESBYTYPE",
];

const SI_PREFIXES: &[(&str, f64)] = &[
    ("EXA", 1e18),
    ("PETA", 1e15),
    ("TERA", 1e12),
    ("GIGA", 1e9),
    ("MEGA", 1e6),
    ("KILO", 1e3),
    ("HECTO", 1e2),
    ("DECA", 1e1),
    ("DECI", 1e-1),
    ("CENTI", 1e-2),
    ("MILLI", 1e-3),
    ("MICRO", 1e-6),
    ("NANO", 1e-9),
    ("PICO", 1e-12),
    ("FEMTO", 1e-15),
    ("ATTO", 1e-18),
];

/// An opened IFC model: STEP entities plus the indexes the exporter needs.
#[derive(Debug)]
pub struct IfcModel {
    step: StepFile,
    /// Element id → ids of relationships naming it, in entity-id order.
    relations: HashMap<u64, Vec<u64>>,
    /// Host element id → ids of the openings voiding it.
    openings: HashMap<u64, Vec<u64>>,
    length_unit_scale: f64,
}

/// Opens and parses an IFC file.
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_metrics::parser::open_ifc_file;
///
/// let model = open_ifc_file("model.ifc")?;
/// println!("{} elements", model.elements().len());
/// # Ok::<(), ifc_metrics::error::ParseError>(())
/// ```
pub fn open_ifc_file<P: AsRef<Path>>(path: P) -> Result<IfcModel, ParseError> {
    IfcModel::open(path)
}

impl IfcModel {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(&path).map_err(|source| ParseError::FileRead {
            path: path.as_ref().to_path_buf(),
            source,
        })?;

        let model = Self::from_step_text(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            schema = %model.schema(),
            entities = model.step.entities.len(),
            "Opened IFC model"
        );
        Ok(model)
    }

    pub fn from_step_text(content: &str) -> Result<Self, ParseError> {
        let step = StepFile::parse(content)?;
        let relations = index_relations(&step);
        let openings = index_openings(&step);
        let length_unit_scale = extract_length_unit_scale(&step);
        tracing::debug!(length_unit_scale, "Resolved project length unit");

        Ok(Self {
            step,
            relations,
            openings,
            length_unit_scale,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.step.schema
    }

    #[must_use]
    pub fn entity(&self, id: u64) -> Option<&StepEntity> {
        self.step.get_entity(id)
    }

    /// Factor converting model length units to metres.
    #[must_use]
    pub fn length_unit_scale(&self) -> f64 {
        self.length_unit_scale
    }

    /// All physical elements, in entity-id order.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.step
            .entities
            .values()
            .filter(|e| ELEMENT_TYPES.contains(&e.entity_type.as_str()))
            .map(element_from_entity)
            .collect()
    }

    /// The element with instance id `id`, if it is one.
    #[must_use]
    pub fn element(&self, id: u64) -> Option<Element> {
        self.entity(id)
            .filter(|e| ELEMENT_TYPES.contains(&e.entity_type.as_str()))
            .map(element_from_entity)
    }

    /// Ids of the relationships whose related objects include `element_id`.
    #[must_use]
    pub fn relations_of(&self, element_id: u64) -> &[u64] {
        self.relations
            .get(&element_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ids of the opening elements voiding `element_id`.
    #[must_use]
    pub fn openings_of(&self, element_id: u64) -> &[u64] {
        self.openings
            .get(&element_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn element_from_entity(entity: &StepEntity) -> Element {
    let optional_string = |index: usize| entity.get_str(index).map(str::to_string);

    // IfcElement: GlobalId, OwnerHistory, Name, Description, ObjectType,
    // ObjectPlacement, Representation, Tag, ...
    Element {
        id: entity.id,
        entity_type: entity.entity_type.clone(),
        global_id: optional_string(0).unwrap_or_default(),
        name: optional_string(2),
        description: optional_string(3),
        object_type: optional_string(4),
        placement: entity.get_ref(5),
        representation: entity.get_ref(6),
    }
}

fn index_relations(step: &StepFile) -> HashMap<u64, Vec<u64>> {
    let mut relations: HashMap<u64, Vec<u64>> = HashMap::new();

    for rel in step
        .entities
        .values()
        .filter(|e| ELEMENT_RELATIONS.contains(&e.entity_type.as_str()))
    {
        // Index 4 = RelatedObjects
        for object_id in rel.get_ref_list(4) {
            relations.entry(object_id).or_default().push(rel.id);
        }
    }

    relations
}

fn index_openings(step: &StepFile) -> HashMap<u64, Vec<u64>> {
    let mut openings: HashMap<u64, Vec<u64>> = HashMap::new();

    // IfcRelVoidsElement: ..., RelatingBuildingElement, RelatedOpeningElement
    for rel in step.get_entities_by_type("IFCRELVOIDSELEMENT") {
        if let (Some(host), Some(opening)) = (rel.get_ref(4), rel.get_ref(5)) {
            openings.entry(host).or_default().push(opening);
        }
    }

    openings
}

fn extract_length_unit_scale(step: &StepFile) -> f64 {
    // Prefer the assignment the project points at, fall back to any assignment.
    let assignment = step
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|project| project.get_ref(8))
        .and_then(|id| step.get_entity(id))
        .or_else(|| step.get_entities_by_type("IFCUNITASSIGNMENT").into_iter().next());

    let Some(assignment) = assignment else {
        return 1.0;
    };

    assignment
        .get_ref_list(0)
        .into_iter()
        .filter_map(|id| step.get_entity(id))
        .find(|unit| unit.get(1).and_then(StepValue::as_enum) == Some("LENGTHUNIT"))
        .and_then(|unit| unit_scale(step, unit, 0))
        .unwrap_or(1.0)
}

fn unit_scale(step: &StepFile, unit: &StepEntity, depth: usize) -> Option<f64> {
    if depth > 8 {
        return None;
    }

    match unit.entity_type.as_str() {
        // IfcSIUnit: Dimensions, UnitType, Prefix, Name
        "IFCSIUNIT" => {
            let prefix = unit.get(2).and_then(StepValue::as_enum);
            Some(
                prefix
                    .and_then(|p| SI_PREFIXES.iter().find(|(name, _)| *name == p))
                    .map_or(1.0, |(_, factor)| *factor),
            )
        }
        // IfcConversionBasedUnit: Dimensions, UnitType, Name, ConversionFactor
        "IFCCONVERSIONBASEDUNIT" => {
            let factor = step.get_entity(unit.get_ref(3)?)?;
            // IfcMeasureWithUnit: ValueComponent, UnitComponent
            let value = factor.get_f64(0)?;
            let base = factor
                .get_ref(1)
                .and_then(|id| step.get_entity(id))
                .and_then(|base| unit_scale(step, base, depth + 1))
                .unwrap_or(1.0);
            Some(value * base)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn model(data: &str) -> IfcModel {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        );
        IfcModel::from_step_text(&content).unwrap()
    }

    #[test]
    fn elements_are_read_in_id_order_with_optional_attributes() {
        let model = model(
            "#20=IFCSLAB('1abc',$,$,$,$,$,$,$,$);
#10=IFCWALL('0xyz',$,'Wall-01','Exterior','Basic Wall',#3,#4,$,$);
#5=IFCBUILDINGSTOREY('0st',$,'Level 1',$,$,$,$,$,.ELEMENT.,0.);",
        );

        let elements = model.elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(
            elements[0],
            Element {
                id: 10,
                entity_type: "IFCWALL".to_string(),
                global_id: "0xyz".to_string(),
                name: Some("Wall-01".to_string()),
                description: Some("Exterior".to_string()),
                object_type: Some("Basic Wall".to_string()),
                placement: Some(3),
                representation: Some(4),
            }
        );
        assert_eq!(elements[1].id, 20);
        assert_eq!(elements[1].name, None);
        assert!(!elements[1].has_representation());
    }

    #[test]
    fn relations_are_indexed_per_element() {
        let model = model(
            "#10=IFCWALL('a',$,$,$,$,$,$,$,$);
#11=IFCWALL('b',$,$,$,$,$,$,$,$);
#30=IFCRELDEFINESBYPROPERTIES('r1',$,$,$,(#10),#40);
#31=IFCRELASSOCIATESMATERIAL('r2',$,$,$,(#10,#11),#50);
#32=IFCRELCONTAINEDINSPATIALSTRUCTURE('r3',$,$,$,(#10),#60);",
        );

        assert_eq!(model.relations_of(10), &[30, 31]);
        assert_eq!(model.relations_of(11), &[31]);
        assert!(model.relations_of(99).is_empty());
    }

    #[test]
    fn distribution_and_furniture_elements_are_included() {
        let model = model(
            "#10=IFCPUMP('a',$,$,$,$,$,$,$,$);
#11=IFCFAN('b',$,$,$,$,$,$,$,$);
#12=IFCCABLESEGMENT('c',$,$,$,$,$,$,$,$);
#13=IFCCABLECARRIERSEGMENT('d',$,$,$,$,$,$,$,$);
#14=IFCELECTRICAPPLIANCE('e',$,$,$,$,$,$,$,$);
#15=IFCSYSTEMFURNITUREELEMENT('f',$,$,$,$,$,$,$,$);
#16=IFCDAMPER('g',$,$,$,$,$,$,$,$);
#17=IFCBOILER('h',$,$,$,$,$,$,$,$);
#18=IFCTANK('i',$,$,$,$,$,$,$,$);
#19=IFCOUTLET('j',$,$,$,$,$,$,$,$);
#20=IFCSENSOR('k',$,$,$,$,$,$,$,$);
#21=IFCLAMP('l',$,$,$,$,$,$,$,$);
#22=IFCUNITARYEQUIPMENT('m',$,$,$,$,$,$,$,$);
#23=IFCEQUIPMENTELEMENT('n',$,$,$,$,$,$,$);
#30=IFCSPACE('s',$,$,$,$,$,$,$,.ELEMENT.,.INTERNAL.,$);
#31=IFCANNOTATION('t',$,$,$,$,$,$);",
        );

        let ids: Vec<u64> = model.elements().iter().map(|e| e.id).collect();
        assert_eq!(ids, (10..=23).collect::<Vec<u64>>());
    }

    #[test]
    fn openings_are_indexed_by_host() {
        let model = model(
            "#10=IFCWALL('w',$,$,$,$,$,$,$,$);
#20=IFCOPENINGELEMENT('o1',$,$,$,$,$,$,$,.OPENING.);
#21=IFCOPENINGELEMENT('o2',$,$,$,$,$,$,$,.OPENING.);
#30=IFCRELVOIDSELEMENT('r1',$,$,$,#10,#20);
#31=IFCRELVOIDSELEMENT('r2',$,$,$,#10,#21);",
        );

        assert_eq!(model.openings_of(10), &[20, 21]);
        assert!(model.openings_of(20).is_empty());
        assert_eq!(model.element(20).map(|e| e.global_id), Some("o1".to_string()));
        assert!(model.element(30).is_none());
    }

    #[test]
    fn millimetre_projects_scale_to_metres() {
        let model = model(
            "#1=IFCPROJECT('p',$,'Project',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3,#4));
#3=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);
#4=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);",
        );
        assert_relative_eq!(model.length_unit_scale(), 0.001);
    }

    #[test]
    fn conversion_based_units_use_their_factor() {
        let model = model(
            "#1=IFCUNITASSIGNMENT((#2));
#2=IFCCONVERSIONBASEDUNIT(#5,.LENGTHUNIT.,'FOOT',#3);
#3=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(0.3048),#4);
#4=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#5=IFCDIMENSIONALEXPONENTS(1,0,0,0,0,0,0);",
        );
        assert_relative_eq!(model.length_unit_scale(), 0.3048);
    }

    #[test]
    fn missing_units_default_to_metres() {
        let model = model("#1=IFCWALL('a',$,$,$,$,$,$,$,$);");
        assert_relative_eq!(model.length_unit_scale(), 1.0);
        assert_eq!(model.schema(), "IFC4");
    }
}
