// Vocabulary for the medical-context detectors.

/// Terms that suggest clinical or health information. Matched on word
/// boundaries, case-insensitively.
pub const MEDICAL_TERMS: &[&str] = &[
    "addiction", "adhd", "admission", "afib", "aids", "aki", "allergies", "allergy",
    "alzheimer disease", "alzheimer's disease", "alzheimers disease", "amputation", "anemia",
    "aneurysm", "angina", "anxiety", "arrhythmia", "arthritis", "asthma",
    "atrial fibrillation", "autism", "autoimmune", "biopsy", "bipolar", "bipolar disorder",
    "blood clot", "blood glucose", "blood pressure", "blood test", "born", "brain injury",
    "bronchitis", "burn", "c-section", "cad", "cancer", "cardiac", "cardiology",
    "cardiomyopathy", "care plan", "cat scan", "catheter", "cbc", "cerebral palsy",
    "cervical spine", "cesarean", "chemotherapy", "chf", "chronic", "chronic kidney disease",
    "chronic pain", "cirrhosis", "clinical", "clinician", "cognition", "cognitive impairment",
    "colitis", "comorbidity", "concussion", "condition", "congenital",
    "congestive heart failure", "copd", "coronary artery disease", "covid 19", "covid-19",
    "crohn disease", "crohn's disease", "crohns disease", "ct scan", "cva",
    "deep vein thrombosis", "defibrillator", "dementia", "depression", "dermatology",
    "diabetes", "diabetes mellitus", "diagnosed", "diagnosis", "diagnostic", "dialysis",
    "disability", "discharge", "disease", "dob", "doctor", "dosage", "dose",
    "drug interaction", "dvt", "ecg", "echo", "echocardiogram", "eczema", "eeg", "ekg",
    "embolism", "emergency department", "emergency room", "emphysema", "endocrinology",
    "epilepsy", "er", "fetal", "fibromyalgia", "follow up", "follow-up", "fracture",
    "gastroenteritis", "gastroenterology", "gerd", "glucose", "gyn", "gynecology",
    "head injury", "heart attack", "heart failure", "heart rate", "hematology", "hemorrhage",
    "hepatitis", "hiv", "hormone", "hospital", "htn", "hyperglycemia", "hyperlipidemia",
    "hypertension", "hyperthyroidism", "hypoglycemia", "hypotension", "hypothyroidism", "ibd",
    "ibs", "icd", "imaging", "immunology", "immunotherapy", "infection", "infectious disease",
    "infertility", "influenza", "infusion", "injury", "inpatient", "insomnia", "insulin",
    "intensive care", "intubation", "kidney disease", "kidney failure", "lab result",
    "labor and delivery", "laceration", "leukemia", "liver disease", "liver failure", "lupus",
    "lymphoma", "malignancy", "mammogram", "medication", "medications", "mental health",
    "metastasis", "metastatic", "mi", "migraine", "mobility", "motor deficit", "mrsa", "ms",
    "multiple sclerosis", "musculoskeletal", "myocardial infarction", "neonatal", "neoplasm",
    "nephrology", "neurologic", "neurology", "neuropathy", "nicu", "nurse", "obesity", "obs",
    "obstetrics", "ocd", "oncology", "operation", "opioid", "opioid use disorder",
    "orthopedic", "orthopedics", "osteoarthritis", "osteoporosis", "ot", "outpatient",
    "oxygen saturation", "pacemaker", "pain", "pain management", "panic disorder", "paralysis",
    "paraplegia", "pathology", "patient", "pe", "pediatric", "pediatrics", "physical therapy",
    "physician", "pneumonia", "post op", "post-op", "postpartum", "prenatal", "prescription",
    "prescriptions", "primary care", "procedure", "prognosis", "provider", "psychiatric",
    "psychiatry", "psychology", "pt", "ptsd", "pulmonary", "pulmonary embolism",
    "quadriplegia", "radiation therapy", "radiology", "radiotherapy", "rehab",
    "rehabilitation", "renal failure", "respiratory failure", "respiratory therapy",
    "rheumatoid arthritis", "sars-cov-2", "schizophrenia", "sci", "seizure", "sepsis",
    "sleep apnea", "spasticity", "specialist", "speech therapy", "spinal", "spinal cord",
    "spinal cord injury", "spo2", "sprain", "std", "sti", "stroke", "substance use disorder",
    "suicidal ideation", "surgery", "symptom", "symptoms", "tachycardia", "tb", "tbi",
    "therapy", "thrombosis", "thyroid", "transplant", "trauma", "traumatic brain injury",
    "treatment", "treatment plan", "triage", "tuberculosis", "tumor", "ulcer",
    "ulcerative colitis", "ultrasound", "urgent care", "urinary tract infection", "urology",
    "uti", "ventilator", "viral load", "vital signs", "wound", "x-ray",
];

/// Free-text columns where a medical term alone is worth a review.
pub const HIGH_RISK_FIELDS: &[&str] = &["notes", "summary", "description", "next_step"];
